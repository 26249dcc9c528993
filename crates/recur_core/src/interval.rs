use crate::error::AppError;
use time::Duration;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: f64 = 7.0 * MILLIS_PER_DAY;
const MILLIS_PER_YEAR: f64 = 365.25 * MILLIS_PER_DAY;
const MAX_INTERVAL_MILLIS: f64 = 1000.0 * MILLIS_PER_YEAR;

/// Parses a recurrence token such as `10d`, `2w`, `3.5d` or `1y` into a
/// fixed-length duration.
///
/// Units: `h` (hour), `d` (24 hours), `w` (7 days), `y` (365.25 days).
/// Calendar-relative units are not accepted.
pub fn parse_interval(token: &str) -> Result<Duration, AppError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(AppError::parse("interval is empty"));
    }

    let unit = trimmed
        .chars()
        .last()
        .ok_or_else(|| AppError::parse("interval is empty"))?;
    let number = trimmed[..trimmed.len() - unit.len_utf8()].trim_end();

    let unit_millis = match unit.to_ascii_lowercase() {
        'h' => MILLIS_PER_HOUR,
        'd' => MILLIS_PER_DAY,
        'w' => MILLIS_PER_WEEK,
        'y' => MILLIS_PER_YEAR,
        other if other.is_ascii_digit() => {
            return Err(AppError::parse(format!("interval '{trimmed}' has no unit")));
        }
        other => {
            return Err(AppError::parse(format!(
                "interval '{trimmed}' has unknown unit '{other}'"
            )));
        }
    };

    let value = parse_amount(number)
        .ok_or_else(|| AppError::parse(format!("interval '{trimmed}' has no valid number")))?;

    let millis = value * unit_millis;
    if millis > MAX_INTERVAL_MILLIS {
        return Err(AppError::parse(format!("interval '{trimmed}' is too long")));
    }

    Ok(Duration::milliseconds(millis.round() as i64))
}

// Digits with at most one decimal point; no sign, exponent or spaces.
fn parse_amount(number: &str) -> Option<f64> {
    let mut digits = 0;
    let mut points = 0;
    for ch in number.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return None,
        }
    }

    if digits == 0 || points > 1 {
        return None;
    }

    number.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Human label used after "every" when showing a recurring task.
/// Unrecognized tokens are shown as written.
pub fn describe_interval(token: &str) -> String {
    let normalized = token.trim().to_ascii_lowercase();
    let label = match normalized.as_str() {
        "12h" => "day 2 times",
        "24h" | "1d" => "day",
        "7d" | "1w" => "week",
        "30d" | "4w" => "month",
        "1y" | "365d" => "year",
        _ => return token.trim().to_string(),
    };
    label.to_string()
}
