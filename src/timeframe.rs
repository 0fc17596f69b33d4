use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MarketDataError;

const MS_IN_HOUR: i64 = 60 * 60 * 1000;
const MS_IN_DAY: i64 = 24 * MS_IN_HOUR;

/// Candle granularity handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "D")]
    D,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [Timeframe::H1, Timeframe::H4, Timeframe::H12, Timeframe::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::H12 => "12h",
            Timeframe::D => "D",
        }
    }

    /// Interval token for Binance kline endpoints.
    pub fn binance_interval(&self) -> &'static str {
        match self {
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::H12 => "12h",
            Timeframe::D => "1d",
        }
    }

    /// Interval token for Bybit v5 kline endpoints.
    pub fn bybit_interval(&self) -> &'static str {
        match self {
            Timeframe::H1 => "60",
            Timeframe::H4 => "240",
            Timeframe::H12 => "720",
            Timeframe::D => "D",
        }
    }

    pub fn interval_ms(&self) -> i64 {
        match self {
            Timeframe::H1 => MS_IN_HOUR,
            Timeframe::H4 => 4 * MS_IN_HOUR,
            Timeframe::H12 => 12 * MS_IN_HOUR,
            Timeframe::D => MS_IN_DAY,
        }
    }

    /// Trailing window used by the rolling VWAP engine.
    pub fn vwap_window_ms(&self) -> i64 {
        match self {
            Timeframe::H1 => MS_IN_DAY,
            Timeframe::H4 => 3 * MS_IN_DAY,
            Timeframe::H12 => 7 * MS_IN_DAY,
            Timeframe::D => 30 * MS_IN_DAY,
        }
    }

    /// Boot-time stagger so the four timeframes do not all hit the
    /// exchanges at once.
    pub fn startup_delay(&self) -> Duration {
        match self {
            Timeframe::H1 | Timeframe::H4 => Duration::ZERO,
            Timeframe::H12 => Duration::from_secs(5 * 60),
            Timeframe::D => Duration::from_secs(10 * 60),
        }
    }

    /// Next UTC wall-clock boundary at which this timeframe's candle
    /// closes: top of hour, every 4th hour, 00:00/12:00 or midnight.
    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = ChronoDuration::hours(1);
        let truncated = now.duration_trunc(hour).unwrap_or(now);
        let step = match self {
            Timeframe::H1 => 1,
            Timeframe::H4 => 4,
            Timeframe::H12 => 12,
            Timeframe::D => 24,
        };
        let mut candidate = truncated;
        loop {
            candidate += hour;
            use chrono::Timelike;
            if candidate.hour() as i64 % step == 0 {
                return candidate;
            }
        }
    }
}

/// Candle close timestamp for an open time: the last millisecond of the
/// interval, matching Binance's closeTime convention.
pub fn close_time(open_time: i64, interval_ms: i64) -> i64 {
    open_time + interval_ms - 1
}

/// Staleness marker for a run's artifacts: two full intervals past the
/// last candle's open.
pub fn expiration_time(last_open_time: i64, timeframe: Timeframe) -> i64 {
    last_open_time + 2 * timeframe.interval_ms() + 1
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "12h" => Ok(Timeframe::H12),
            "D" => Ok(Timeframe::D),
            other => Err(MarketDataError::InvalidTimeframe(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn interval_tokens_match_exchange_conventions() {
        assert_eq!(Timeframe::H4.binance_interval(), "4h");
        assert_eq!(Timeframe::D.binance_interval(), "1d");
        assert_eq!(Timeframe::H1.bybit_interval(), "60");
        assert_eq!(Timeframe::D.bybit_interval(), "D");
    }

    #[test]
    fn close_time_is_last_millisecond() {
        assert_eq!(close_time(0, Timeframe::H1.interval_ms()), 3_599_999);
    }

    #[test]
    fn expiration_is_two_intervals_plus_one() {
        assert_eq!(expiration_time(1_000, Timeframe::H1), 1_000 + 7_200_001);
    }

    #[test]
    fn next_fire_lands_on_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 13, 20, 0).unwrap();
        assert_eq!(Timeframe::H1.next_fire(now).hour(), 14);
        assert_eq!(Timeframe::H4.next_fire(now).hour(), 16);
        assert_eq!(Timeframe::H12.next_fire(now).hour(), 0);
        let fire = Timeframe::D.next_fire(now);
        assert_eq!((fire.hour(), fire.day()), (0, 4));
    }

    #[test]
    fn timeframe_round_trips_through_str() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("3h".parse::<Timeframe>().is_err());
    }
}
