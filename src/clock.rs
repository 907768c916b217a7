use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;

    /// Real time left until the wall clock shows `at`.
    fn duration_until(&self, at: NaiveDateTime) -> Duration {
        (at - self.now()).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }

    fn duration_until(&self, at: NaiveDateTime) -> Duration {
        let remaining = match self.timezone {
            Some(tz) => zoned_until(&tz, at, Utc::now()),
            None => zoned_until(&Local, at, Utc::now()),
        };
        remaining
            .unwrap_or_else(|| at - self.now())
            .to_std()
            .unwrap_or_default()
    }
}

// None when `at` falls into a DST gap and does not exist in `tz`.
fn zoned_until<Z: TimeZone>(tz: &Z, at: NaiveDateTime, now: DateTime<Utc>) -> Option<TimeDelta> {
    tz.from_local_datetime(&at)
        .earliest()
        .map(|local| local.with_timezone(&Utc) - now)
}
