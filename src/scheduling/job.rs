use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use tokio_util::sync::CancellationToken;

use super::SubscriberKey;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    OneShot,
    DailyRecurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyFireTime(NaiveTime);

impl DailyFireTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner.with_nanosecond(0).expect("Will never fail.");
        Self(normalized_time)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledJob<K: SubscriberKey> {
    pub id: JobId,
    pub subscriber: K,
    pub kind: JobKind,
    pub next_fire_at: NaiveDateTime,
    pub fire_time: DailyFireTime,
    cancellation_token: CancellationToken,
}

impl<K: SubscriberKey> ScheduledJob<K> {
    pub(super) fn new(
        id: JobId,
        subscriber: K,
        kind: JobKind,
        next_fire_at: NaiveDateTime,
        fire_time: DailyFireTime,
    ) -> Self {
        Self {
            id,
            subscriber,
            kind,
            next_fire_at,
            fire_time,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> String {
        self.subscriber.to_string()
    }

    pub(super) fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub(super) fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}

// Hitting today's slot exactly counts as already passed.
pub fn first_fire(fire_time: &DailyFireTime, now: NaiveDateTime) -> (JobKind, NaiveDateTime) {
    let today_fire = fire_time.on(now.date());
    if now >= today_fire {
        (JobKind::OneShot, next_day(today_fire))
    } else {
        (JobKind::DailyRecurring, today_fire)
    }
}

pub fn next_fire_after(
    fire_time: &DailyFireTime,
    previous: NaiveDateTime,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let mut next = next_day(fire_time.on(previous.date()));
    if next <= now {
        let (_, caught_up) = first_fire(fire_time, now);
        next = caught_up;
    }
    next
}

fn next_day(slot: NaiveDateTime) -> NaiveDateTime {
    slot.checked_add_signed(TimeDelta::days(1))
        .expect("Not realistic to overflow")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    use super::*;

    fn fire_time() -> DailyFireTime {
        DailyFireTime::new(NaiveTime::from_hms_opt(20, 4, 40).unwrap())
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    pub fn before_slot_schedules_daily_job_for_today() {
        let (kind, fire_at) = first_fire(&fire_time(), at(2027, 3, 1, 10, 0, 0));

        assert_eq!(kind, JobKind::DailyRecurring);
        assert_eq!(fire_at, at(2027, 3, 1, 20, 4, 40));
    }

    #[test]
    pub fn after_slot_schedules_one_shot_for_tomorrow() {
        let (kind, fire_at) = first_fire(&fire_time(), at(2027, 3, 1, 21, 0, 0));

        assert_eq!(kind, JobKind::OneShot);
        assert_eq!(fire_at, at(2027, 3, 2, 20, 4, 40));
    }

    #[test]
    pub fn exactly_at_slot_counts_as_passed() {
        let (kind, fire_at) = first_fire(&fire_time(), at(2027, 3, 1, 20, 4, 40));

        assert_eq!(kind, JobKind::OneShot);
        assert_eq!(fire_at, at(2027, 3, 2, 20, 4, 40));
    }

    #[test]
    pub fn next_fire_is_one_day_later() {
        let previous = at(2027, 3, 1, 20, 4, 40);

        let next = next_fire_after(&fire_time(), previous, previous);

        assert_eq!(next, at(2027, 3, 2, 20, 4, 40));
    }

    #[test]
    pub fn next_fire_skips_missed_days() {
        let previous = at(2027, 3, 1, 20, 4, 40);
        let now = at(2027, 3, 4, 21, 0, 0);

        let next = next_fire_after(&fire_time(), previous, now);

        assert_eq!(next, at(2027, 3, 5, 20, 4, 40));
    }

    #[test]
    pub fn fire_time_drops_sub_second_precision() {
        let raw = NaiveTime::from_hms_milli_opt(20, 4, 40, 500).unwrap();

        assert_eq!(
            *DailyFireTime::new(raw).time(),
            NaiveTime::from_hms_opt(20, 4, 40).unwrap()
        );
    }

    fn now_strategy() -> impl Strategy<Value = NaiveDateTime> {
        (0i64..(200 * 365 * 86_400)).prop_map(|secs| {
            at(1970, 1, 1, 0, 0, 0) + TimeDelta::seconds(secs)
        })
    }

    proptest! {
        #[test]
        fn first_fire_is_in_future_at_fire_time(
            now in now_strategy(),
            time in arb::<NaiveTime>()
        ) {
            let fire_time = DailyFireTime::new(time);

            let (_, fire_at) = first_fire(&fire_time, now);

            prop_assert!(fire_at > now, "Fire time should always be in the future");
            prop_assert_eq!(fire_at.time(), *fire_time.time());
            prop_assert!((fire_at - now) <= TimeDelta::days(1), "Delay should be one day or less");
        }

        #[test]
        fn next_fire_is_in_future_at_fire_time(
            previous in now_strategy(),
            lag in 0i64..(10 * 86_400),
            time in arb::<NaiveTime>()
        ) {
            let fire_time = DailyFireTime::new(time);
            let previous = fire_time.on(previous.date());
            let now = previous + TimeDelta::seconds(lag);

            let next = next_fire_after(&fire_time, previous, now);

            prop_assert!(next > now);
            prop_assert!(next > previous);
            prop_assert_eq!(next.time(), *fire_time.time());
            prop_assert!((next - now) <= TimeDelta::days(1));
        }
    }
}
