use crate::error::AppError;

/// Parse a position in seconds with an optional unit: "90", "90s", "1.5m", "2h".
pub fn parse_time(time_str: &str) -> Result<f64, AppError> {
    let time_str = time_str.trim().to_ascii_lowercase();
    if time_str.is_empty() {
        return Err(AppError::ParseError("Invalid time: empty string".to_string()));
    }

    let split = time_str
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(time_str.len());
    let (number, unit) = time_str.split_at(split);

    let value = number
        .parse::<f64>()
        .map_err(|_| AppError::ParseError(format!("Invalid time: {time_str}")))?;
    let seconds = match unit.trim() {
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(AppError::ParseError(format!("Invalid time unit: {other}"))),
    };
    Ok(seconds)
}

/// Render seconds as `HH:MM:SS.mmm`.
pub fn format_duration(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}
