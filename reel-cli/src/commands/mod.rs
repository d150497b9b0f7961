pub mod fetch;
pub mod mux;
