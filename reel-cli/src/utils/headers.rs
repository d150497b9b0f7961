use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Split a "Name: Value" header argument.
fn split_header(header_str: &str) -> Option<(&str, &str)> {
    let (name, value) = header_str.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value.trim()))
}

/// Collect "Name: Value" arguments into request headers. Malformed entries
/// are skipped with a warning; a repeated name keeps the last value.
pub fn parse_headers(header_strings: &[String]) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    for header_str in header_strings {
        let Some((name, value)) = split_header(header_str) else {
            warn!(
                "Invalid header format: '{}'. Expected 'Name: Value'",
                header_str
            );
            continue;
        };
        debug!("Adding header: {}: {}", name, value);
        headers.insert(name.to_string(), value.to_string());
    }

    headers
}
