use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, Utc};

/// Wall-clock source. Read on every call, never cached.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date in the classroom's time zone. Leave ranges and session
    /// dates are local dates, not UTC ones.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock that only moves when told to. Used for replays and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Manual clock whose local time zone is UTC.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    /// Manual clock reporting `today()` at a fixed UTC offset.
    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(start),
            offset,
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_today_follows_its_offset() {
        let late_evening_utc = Utc.with_ymd_and_hms(2024, 11, 20, 23, 30, 0).unwrap();
        let beijing = FixedOffset::east_opt(8 * 3600).unwrap();

        let utc_clock = ManualClock::new(late_evening_utc);
        let local_clock = ManualClock::with_offset(late_evening_utc, beijing);

        assert_eq!(utc_clock.today(), NaiveDate::from_ymd_opt(2024, 11, 20).unwrap());
        assert_eq!(local_clock.today(), NaiveDate::from_ymd_opt(2024, 11, 21).unwrap());

        // 00:30 local time on the 21st.
        local_clock.advance(Duration::hours(-7));
        assert_eq!(local_clock.today(), NaiveDate::from_ymd_opt(2024, 11, 21).unwrap());
        // 23:59 local time on the 20th.
        local_clock.advance(Duration::minutes(-31));
        assert_eq!(local_clock.today(), NaiveDate::from_ymd_opt(2024, 11, 20).unwrap());
    }
}
