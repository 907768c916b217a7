use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub days_left: i64,
    pub message: String,
}

/// Counts whole calendar days from `now`'s date to `target`. The time of day is ignored.
pub fn compute(now: NaiveDateTime, target: NaiveDate) -> Countdown {
    let days_left = (target - now.date()).num_days();
    let message = match days_left {
        n if n > 0 => format!("{n} days remain"),
        0 => "today is the event".to_owned(),
        _ => "event has passed".to_owned(),
    };

    Countdown { days_left, message }
}
