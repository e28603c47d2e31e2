use chrono::{NaiveDateTime, Timelike};

/// One sample of the clock, normalized to a 12 hour face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockReading {
    hour: u8,
    minute: u8,
    second: u8,
}

impl ClockReading {
    /// Builds a reading, wrapping the hour to 0..=11.
    ///
    /// Minutes and seconds are clamped to 59.
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour: hour % 12,
            minute: minute.min(59),
            second: second.min(59),
        }
    }

    pub fn from_datetime(datetime: &NaiveDateTime) -> Self {
        Self::new(
            datetime.hour() as u8,
            datetime.minute() as u8,
            datetime.second() as u8,
        )
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// Minute rounded down to a multiple of five.
    pub fn five_minute(&self) -> u8 {
        self.minute - self.minute % 5
    }

    /// Second rounded down to a multiple of five.
    pub fn five_second(&self) -> u8 {
        self.second - self.second % 5
    }

    pub fn is_even_second(&self) -> bool {
        self.second % 2 == 0
    }

    /// Seconds elapsed inside the current five second bucket (0..=4).
    pub fn bucket_offset(&self) -> u8 {
        self.second - self.five_second()
    }
}

/// Kind of five minute boundary that was crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FiveMinuteEdge {
    /// The new bucket is 15, 30 or 45.
    Quarter,
    /// Any other bucket, the full hour included.
    Ordinary,
}

impl FiveMinuteEdge {
    pub fn for_bucket(five_minute: u8) -> Self {
        match five_minute {
            15 | 30 | 45 => FiveMinuteEdge::Quarter,
            _ => FiveMinuteEdge::Ordinary,
        }
    }
}

/// Which parts of the time changed since the previous sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChangeEdges {
    pub hour_changed: bool,
    pub five_minute: Option<FiveMinuteEdge>,
    pub minute_changed: bool,
    pub any_changed: bool,
}

impl ChangeEdges {
    /// Compares two readings bucket by bucket.
    pub fn between(previous: &ClockReading, current: &ClockReading) -> Self {
        let hour_changed = previous.hour() != current.hour();
        let five_minute = (previous.five_minute() != current.five_minute())
            .then(|| FiveMinuteEdge::for_bucket(current.five_minute()));
        let minute_changed = previous.minute() != current.minute();
        let any_changed = hour_changed
            || five_minute.is_some()
            || previous.five_second() != current.five_second();

        Self {
            hour_changed,
            five_minute,
            minute_changed,
            any_changed,
        }
    }

    pub fn quarter_changed(&self) -> bool {
        self.five_minute == Some(FiveMinuteEdge::Quarter)
    }

    pub fn five_minute_changed(&self) -> bool {
        self.five_minute.is_some()
    }
}

/// Subscriber to the per tick change edges, e.g. speech or patterns.
pub trait ChangeListener {
    fn on_tick(&mut self, edges: &ChangeEdges, reading: &ClockReading);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hours_wrap_to_twelve_hour_face() {
        assert_eq!(ClockReading::new(0, 0, 0).hour(), 0);
        assert_eq!(ClockReading::new(12, 0, 0).hour(), 0);
        assert_eq!(ClockReading::new(23, 0, 0).hour(), 11);
    }

    #[test]
    fn buckets_round_down() {
        let reading = ClockReading::new(3, 34, 58);
        assert_eq!(reading.five_minute(), 30);
        assert_eq!(reading.five_second(), 55);
        assert_eq!(reading.bucket_offset(), 3);
        assert!(reading.is_even_second());
    }

    #[test]
    fn quarter_and_ordinary_boundaries() {
        let before = ClockReading::new(4, 14, 59);
        let after = ClockReading::new(4, 15, 0);
        let edges = ChangeEdges::between(&before, &after);
        assert!(edges.quarter_changed());
        assert!(edges.minute_changed);
        assert!(!edges.hour_changed);
        assert!(edges.any_changed);

        let before = ClockReading::new(4, 59, 59);
        let after = ClockReading::new(5, 0, 0);
        let edges = ChangeEdges::between(&before, &after);
        assert_eq!(edges.five_minute, Some(FiveMinuteEdge::Ordinary));
        assert!(edges.hour_changed);
    }

    #[test]
    fn plain_second_change_is_not_an_edge() {
        let edges = ChangeEdges::between(&ClockReading::new(1, 2, 5), &ClockReading::new(1, 2, 6));
        assert_eq!(edges, ChangeEdges::default());
    }

    #[test]
    fn five_second_bucket_change_is_an_edge() {
        let edges = ChangeEdges::between(&ClockReading::new(1, 2, 9), &ClockReading::new(1, 2, 10));
        assert!(edges.any_changed);
        assert!(!edges.minute_changed);
        assert!(edges.five_minute.is_none());
    }

    proptest! {
        #[test]
        fn five_minute_bucket_matches_definition(minute in 0u8..60) {
            let reading = ClockReading::new(0, minute, 0);
            prop_assert_eq!(reading.five_minute(), minute - minute % 5);
            prop_assert!(reading.five_minute() / 5 < 12);
        }

        #[test]
        fn hour_is_always_on_the_face(hour in 0u8..24) {
            let reading = ClockReading::new(hour, 0, 0);
            prop_assert!(reading.hour() < 12);
            prop_assert_eq!(reading.hour(), ClockReading::new(hour % 12, 0, 0).hour());
        }
    }
}
