use crate::error::AppError;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Parse a byte count with an optional binary unit: "100000", "512KB", "1.5mb".
pub fn parse_size(size_str: &str) -> Result<u64, AppError> {
    let size_str = size_str.trim().to_ascii_lowercase();
    if size_str.is_empty() {
        return Err(AppError::ParseError("Invalid size: empty string".to_string()));
    }

    let split = size_str
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(size_str.len());
    let (number, unit) = size_str.split_at(split);

    if unit.is_empty() {
        return number
            .parse::<u64>()
            .map_err(|_| AppError::ParseError(format!("Invalid size: {size_str}")));
    }

    let multiplier = match unit.trim() {
        "b" => 1,
        "k" | "kb" => KB,
        "m" | "mb" => MB,
        "g" | "gb" => GB,
        other => return Err(AppError::ParseError(format!("Invalid size unit: {other}"))),
    };
    let value = number
        .parse::<f64>()
        .map_err(|_| AppError::ParseError(format!("Invalid size: {size_str}")))?;
    Ok((value * multiplier as f64) as u64)
}

/// Convert bytes to a human-readable format
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
