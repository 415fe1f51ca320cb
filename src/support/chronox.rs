//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mimegraph.
//
// Mimegraph is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mimegraph is distributed in the hope  that it will be useful, but WITHOUT
// ANY WARRANTY; without even the  implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See  the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mimegraph. If not, see <http://www.gnu.org/licenses/>.

//! Timestamp formatting compatible with the records already in the wild.
//!
//! Existing records render times as RFC 3339 with the fractional seconds
//! trimmed of trailing zeroes (and omitted entirely when zero), and with `Z`
//! rather than `+00:00` for UTC. chrono's own RFC 3339 output only trims to
//! 0, 3, 6, or 9 digits, so we do it ourselves.

use std::fmt::Write as _;

use chrono::prelude::*;

/// The "zero time" older writers emitted for a part with no date.
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Formats `t` in the RFC 3339 dialect used by stored records.
pub fn format_record_time(t: &DateTime<FixedOffset>) -> String {
    let mut s = t.format("%Y-%m-%dT%H:%M:%S").to_string();

    // Leap seconds are represented with nanosecond >= 1e9
    let nanos = t.nanosecond() % 1_000_000_000;
    if 0 != nanos {
        let mut frac = format!("{:09}", nanos);
        while frac.ends_with('0') {
            frac.pop();
        }
        s.push('.');
        s.push_str(&frac);
    }

    let offset = t.offset().local_minus_utc();
    if 0 == offset {
        s.push('Z');
    } else {
        let sign = if offset < 0 { '-' } else { '+' };
        let offset = offset.abs();
        let _ = write!(s, "{}{:02}:{:02}", sign, offset / 3600, offset / 60 % 60);
    }

    s
}

/// Returns whether `t` survives `format_record_time` followed by
/// `parse_record_time`.
///
/// RFC 3339 only has four-digit years, and the zero time reads back as no time
/// at all.
pub fn is_representable(t: &DateTime<FixedOffset>) -> bool {
    (0..=9999).contains(&t.year()) && ZERO_TIME != format_record_time(t)
}

/// Parses a record time.
///
/// The zero time yields `Ok(None)`; anything RFC 3339 does not accept is an
/// error.
pub fn parse_record_time(
    s: &str,
) -> Result<Option<DateTime<FixedOffset>>, chrono::ParseError> {
    if ZERO_TIME == s {
        return Ok(None);
    }

    DateTime::parse_from_rfc3339(s).map(Some)
}

#[cfg(test)]
mod test {
    use super::*;

    fn offset(secs: i32) -> FixedOffset {
        FixedOffset::east_opt(secs).unwrap()
    }

    #[test]
    fn format_whole_seconds() {
        let t = offset(0).with_ymd_and_hms(2020, 6, 1, 12, 30, 5).unwrap();
        assert_eq!("2020-06-01T12:30:05Z", format_record_time(&t));

        let t = offset(-5 * 3600 - 30 * 60)
            .with_ymd_and_hms(1999, 12, 31, 23, 59, 59)
            .unwrap();
        assert_eq!("1999-12-31T23:59:59-05:30", format_record_time(&t));

        let t = offset(2 * 3600)
            .with_ymd_and_hms(2021, 1, 2, 3, 4, 5)
            .unwrap();
        assert_eq!("2021-01-02T03:04:05+02:00", format_record_time(&t));
    }

    #[test]
    fn format_fractional_seconds() {
        let t = offset(0)
            .with_ymd_and_hms(2020, 6, 1, 12, 30, 5)
            .unwrap()
            .with_nanosecond(120_000_000)
            .unwrap();
        assert_eq!("2020-06-01T12:30:05.12Z", format_record_time(&t));

        let t = t.with_nanosecond(1).unwrap();
        assert_eq!("2020-06-01T12:30:05.000000001Z", format_record_time(&t));
    }

    #[test]
    fn parse_round_trip() {
        for s in &[
            "2020-06-01T12:30:05Z",
            "2020-06-01T12:30:05.12Z",
            "1999-12-31T23:59:59-05:30",
        ] {
            let t = parse_record_time(s).unwrap().unwrap();
            assert_eq!(*s, format_record_time(&t));
        }

        assert_eq!(None, parse_record_time(ZERO_TIME).unwrap());
        assert!(parse_record_time("+10000-01-01T00:00:00Z").is_err());
        assert!(parse_record_time("yesterday").is_err());
    }

    #[test]
    fn representable_times() {
        let utc = offset(0);
        assert!(is_representable(
            &utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()
        ));
        assert!(is_representable(
            &utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap()
        ));
        assert!(!is_representable(
            &utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap()
        ));
        assert!(!is_representable(
            &utc.with_ymd_and_hms(-1, 1, 1, 0, 0, 0).unwrap()
        ));
        assert!(!is_representable(
            &utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
        ));
        assert!(is_representable(
            &offset(3600).with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
        ));
    }
}
