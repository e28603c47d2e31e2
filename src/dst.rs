//! Western-European daylight saving rule.
//!
//! Summer time starts on the last Sunday of March at 02:00 (clocks jump to
//! 03:00) and ends on the last Sunday of October at 03:00 (clocks fall back
//! to 02:00).

use chrono::{Datelike, NaiveDateTime, Timelike};

const MONTH_OFFSETS: [i32; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

pub const START_MONTH: u32 = 3;
pub const END_MONTH: u32 = 10;
pub const START_HOUR: u32 = 2;
pub const END_HOUR: u32 = 3;

/// Day of the week for a Gregorian date, 0 = Sunday .. 6 = Saturday.
///
/// `month` is 1..=12.
pub fn day_of_week(year: i32, month: u32, day: u32) -> u8 {
    let y = if month < 3 { year - 1 } else { year };
    let t = MONTH_OFFSETS[(month.clamp(1, 12) - 1) as usize];
    (y + y / 4 - y / 100 + y / 400 + t + day as i32).rem_euclid(7) as u8
}

/// Day of the month of the last Sunday, searched from the 25th.
///
/// Only meaningful for 31 day months.
pub fn last_sunday(year: i32, month: u32) -> u32 {
    (25..=31)
        .find(|&day| day_of_week(year, month, day) == 0)
        .unwrap_or(31)
}

/// A clock change that is due right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Move forward one hour into summer time.
    ToSummer,
    /// Move back one hour into winter time.
    ToWinter,
}

impl Transition {
    /// Offset in hours to apply to the clock.
    pub fn offset_hours(self) -> i64 {
        match self {
            Transition::ToSummer => 1,
            Transition::ToWinter => -1,
        }
    }

    /// DST flag once the transition has been applied.
    pub fn resulting_dst(self) -> bool {
        matches!(self, Transition::ToSummer)
    }
}

/// Returns the transition to apply at `now` given the current DST flag.
pub fn due_transition(now: &NaiveDateTime, dst: bool) -> Option<Transition> {
    let date = now.date();
    let on_switch_sunday =
        day_of_week(date.year(), date.month(), date.day()) == 0 && date.day() >= 25;
    if !on_switch_sunday {
        return None;
    }

    match (date.month(), now.hour(), dst) {
        (END_MONTH, END_HOUR, true) => Some(Transition::ToWinter),
        (START_MONTH, START_HOUR, false) => Some(Transition::ToSummer),
        _ => None,
    }
}

/// Guesses the DST state from the date alone.
///
/// On the switch day itself the state before the switch is assumed, even
/// when the switch hour has already passed.
pub fn infer(now: &NaiveDateTime) -> bool {
    let date = now.date();
    let mut dst = (4..=10).contains(&date.month());

    if date.month() == START_MONTH || date.month() == END_MONTH {
        let switch_day = last_sunday(date.year(), date.month());
        debug!("DST switches this month on day {}", switch_day);
        if date.day() > switch_day {
            dst = !dst;
        }
    }

    dst
}
