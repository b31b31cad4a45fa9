//! Duration strings (`"150ms"`, `"2s"`, `"1m"`) used by the step DSL.

use crate::{HotstepError, HotstepResult};

/// Parse a duration string into milliseconds.
pub fn parse_duration(s: &str) -> HotstepResult<u64> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s, ""),
    };
    if digits.is_empty() {
        return Err(HotstepError::InvalidArgument(format!(
            "invalid duration {s:?}: missing numeric part"
        )));
    }
    let value: u64 = digits.parse().map_err(|_| {
        HotstepError::InvalidArgument(format!("invalid duration {s:?}: bad numeric part"))
    })?;
    let ms = match unit {
        "ms" => Some(value),
        "s" => value.checked_mul(1_000),
        "m" => value.checked_mul(60_000),
        _ => {
            return Err(HotstepError::InvalidArgument(format!(
                "invalid duration {s:?}: expected a ms/s/m suffix"
            )));
        }
    };
    ms.ok_or_else(|| HotstepError::InvalidArgument(format!("invalid duration {s:?}: overflow")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse_duration("150ms").unwrap(), 150);
        assert_eq!(parse_duration("2s").unwrap(), 2_000);
        assert_eq!(parse_duration("1m").unwrap(), 60_000);
        assert_eq!(parse_duration(" 10ms ").unwrap(), 10);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10h").is_err());
        assert!(parse_duration("-5ms").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration(&format!("{}s", u64::MAX)).is_err());
    }
}
