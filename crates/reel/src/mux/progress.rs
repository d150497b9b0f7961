//! Parser for ffmpeg's `-progress` output.
//!
//! ffmpeg writes blocks of `key=value` lines; every block ends with a
//! `progress=continue` or `progress=end` line.

/// One progress block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuxProgress {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub total_size: Option<u64>,
    /// Output position as ffmpeg prints it, `HH:MM:SS.micros`.
    pub out_time: Option<String>,
    /// Processing speed, e.g. `1.5x`.
    pub speed: Option<String>,
    /// Set on the block closed by `progress=end`.
    pub finished: bool,
}

/// Accumulates lines until a block is complete.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: MuxProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the finished block when `line` closes one.
    pub fn push_line(&mut self, line: &str) -> Option<MuxProgress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key.trim() {
            "frame" => self.current.frame = value.parse().ok(),
            "fps" => self.current.fps = value.parse().ok(),
            "total_size" => self.current.total_size = value.parse().ok(),
            "out_time" => self.current.out_time = available(value),
            "speed" => self.current.speed = available(value),
            "progress" => {
                let mut block = std::mem::take(&mut self.current);
                block.finished = value == "end";
                return Some(block);
            }
            _ => {}
        }
        None
    }
}

fn available(value: &str) -> Option<String> {
    match value {
        "" | "N/A" => None,
        value => Some(value.to_string()),
    }
}
