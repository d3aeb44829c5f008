// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride timestamps are epoch milliseconds; everything else is `DateTime<Utc>`.

use chrono::{DateTime, Utc};

/// Epoch milliseconds, the unit rides are stored in.
pub fn to_millis(date: DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

/// Inverse of [`to_millis`]. Out-of-range values clamp to the epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_millis_round_trip() {
        let date = Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap();
        assert_eq!(to_millis(date), 1_777_863_721_000);
        assert_eq!(from_millis(to_millis(date)), date);
    }

    #[test]
    fn test_out_of_range_millis_clamp() {
        assert_eq!(from_millis(i64::MAX), DateTime::UNIX_EPOCH);
    }
}
