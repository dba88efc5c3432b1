// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `duration.rs`

#[cfg(test)]
mod tests {
    use crate::duration::{parse_chrono_duration, parse_duration};
    use std::time::Duration;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("30d").unwrap(), Duration::from_secs(2_592_000));
        assert_eq!(parse_duration("4w").unwrap(), Duration::from_secs(2_419_200));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2h0m10s").unwrap(), Duration::from_secs(7210));
    }

    #[test]
    fn test_parse_zero_and_whitespace() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration(" 10m ").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("1h-5m").is_err());
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_duration("99999999999999999999w").is_err());
        assert!(parse_duration("18446744073709551615w").is_err());
    }

    #[test]
    fn test_parse_chrono_duration() {
        assert_eq!(
            parse_chrono_duration("2h").unwrap(),
            chrono::Duration::hours(2)
        );
    }
}
