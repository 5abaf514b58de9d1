use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::error::{AppError, AppResult};

/// Error text shown when a deadline is not `DD-MM-YYYY`.
pub const INVALID_FORMAT_MESSAGE: &str =
    "The deadline must be in the format of dd-mm-yyyy. Please try again.";

/// Error text shown when a deadline is not in the future.
pub const PAST_DEADLINE_MESSAGE: &str = "The deadline must be a future date. Please try again.";

/// A validated `DD-MM-YYYY` deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(NaiveDate);

impl Deadline {
    /// Parse a strict `DD-MM-YYYY` string.
    ///
    /// Only ASCII digits and hyphens in exactly that shape are accepted;
    /// shapes like `1-1-2099` or `2099-01-01` are rejected, and so are
    /// impossible dates such as `31-02-2099`.
    pub fn parse(input: &str) -> AppResult<Self> {
        let bytes = input.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[2] == b'-'
            && bytes[5] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
        if !shape_ok {
            return Err(AppError::Validation(INVALID_FORMAT_MESSAGE.to_string()));
        }

        let day: u32 = input[0..2].parse().map_err(|_| invalid_format())?;
        let month: u32 = input[3..5].parse().map_err(|_| invalid_format())?;
        let year: i32 = input[6..10].parse().map_err(|_| invalid_format())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Deadline)
            .ok_or_else(invalid_format)
    }

    /// The deadline day counts until `23:59:59` local time.
    pub fn end_of_day(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.at(offset, NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
    }

    /// Calendar end time: the deadline day at local noon.
    pub fn calendar_end(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.at(offset, NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn is_future(&self, now: DateTime<FixedOffset>) -> bool {
        self.end_of_day(*now.offset()) > now
    }

    /// Reject deadlines whose day has already ended at `now`.
    pub fn ensure_future(&self, now: DateTime<FixedOffset>) -> AppResult<()> {
        if self.is_future(now) {
            Ok(())
        } else {
            Err(AppError::Validation(PAST_DEADLINE_MESSAGE.to_string()))
        }
    }

    /// ISO date (`YYYY-MM-DD`) used for all-day calendar events.
    pub fn iso_date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    fn at(&self, offset: FixedOffset, time: NaiveTime) -> DateTime<FixedOffset> {
        let naive = self.0.and_time(time);
        // A fixed offset has exactly one mapping for every local time.
        offset
            .from_local_datetime(&naive)
            .single()
            .unwrap_or_else(|| offset.from_utc_datetime(&naive))
    }
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%d-%m-%Y"))
    }
}

fn invalid_format() -> AppError {
    AppError::Validation(INVALID_FORMAT_MESSAGE.to_string())
}

/// Parse a UTC offset such as `+01:00`, `-05:30` or `GMT+01:00`.
pub fn parse_utc_offset(input: &str) -> Option<FixedOffset> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("GMT")
        .or_else(|| trimmed.strip_prefix("UTC"))
        .unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match trimmed.as_bytes().first()? {
        b'+' => (1, &trimmed[1..]),
        b'-' => (-1, &trimmed[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn parses_valid_deadline() {
        let d = Deadline::parse("05-03-2099").unwrap();
        assert_eq!(d.to_string(), "05-03-2099");
        assert_eq!(d.iso_date(), "2099-03-05");
    }

    #[test]
    fn rejects_other_shapes() {
        for input in [
            "",
            "1-1-2099",
            "2099-01-01",
            "01/01/2099",
            "01-01-99",
            "01-01-20999",
            " 01-01-2099",
            "aa-bb-cccc",
            "01-+1-2099",
        ] {
            match Deadline::parse(input) {
                Err(AppError::Validation(msg)) => assert_eq!(msg, INVALID_FORMAT_MESSAGE),
                other => panic!("{:?} should be rejected, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(Deadline::parse("31-02-2099").is_err());
        assert!(Deadline::parse("00-01-2099").is_err());
        assert!(Deadline::parse("01-13-2099").is_err());
        assert!(Deadline::parse("29-02-2096").is_ok());
    }

    #[test]
    fn today_is_future_until_day_end() {
        let d = Deadline::parse("19-10-2026").unwrap();
        let morning = cet().with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let last_second = cet().with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        let next_day = cet().with_ymd_and_hms(2026, 10, 20, 0, 0, 1).unwrap();

        assert!(d.is_future(morning));
        assert!(!d.is_future(last_second));
        assert!(!d.is_future(next_day));
        assert!(d.ensure_future(next_day).is_err());
    }

    #[test]
    fn calendar_end_is_local_noon() {
        let d = Deadline::parse("01-01-2099").unwrap();
        assert_eq!(
            d.calendar_end(cet()).to_rfc3339(),
            "2099-01-01T12:00:00+01:00"
        );
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_utc_offset("+01:00"), FixedOffset::east_opt(3600));
        assert_eq!(parse_utc_offset("GMT+01:00"), FixedOffset::east_opt(3600));
        assert_eq!(parse_utc_offset("-05:30"), FixedOffset::east_opt(-19800));
        assert_eq!(parse_utc_offset("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("+2"), FixedOffset::east_opt(7200));
        assert_eq!(parse_utc_offset("01:00"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
    }

    proptest! {
        #[test]
        fn valid_dates_round_trip(day in 1u32..=28, month in 1u32..=12, year in 1000i32..=9999) {
            let input = format!("{:02}-{:02}-{:04}", day, month, year);
            let parsed = Deadline::parse(&input).unwrap();
            prop_assert_eq!(parsed.iso_date(), format!("{:04}-{:02}-{:02}", year, month, day));
            prop_assert_eq!(parsed.to_string(), input);
        }

        #[test]
        fn non_matching_shapes_are_rejected(input in "\\PC{0,12}") {
            let bytes = input.as_bytes();
            let matches_shape = bytes.len() == 10
                && bytes.iter().enumerate().all(|(i, b)| {
                    if i == 2 || i == 5 { *b == b'-' } else { b.is_ascii_digit() }
                });
            prop_assume!(!matches_shape);
            prop_assert!(Deadline::parse(&input).is_err());
        }
    }
}
