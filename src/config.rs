//! Clock configuration

use chrono::{NaiveDate, NaiveDateTime};

/// Number of LEDs on the ring. The face arithmetic assumes twelve.
pub const RING_SIZE: usize = 12;

/// Control loop period in milliseconds.
pub const TICK_MS: u32 = 10;

/// Global brightness applied when a frame is flushed to the ring.
pub const LED_BRIGHTNESS: u8 = 128;

/// DS1307 RAM slot holding the persisted DST flag.
pub const DST_NVRAM_ADDRESS: u8 = 0;

/// Number of colour steps shown by the fault alarm.
pub const ALARM_STEPS: u8 = 20;

/// Duration of one fault alarm step in milliseconds.
pub const ALARM_STEP_MS: u32 = 500;

/// Time written to a halted RTC before it is started.
pub fn fallback_datetime() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 1, 1)?.and_hms_opt(12, 0, 0)
}

/// Brightness and pulse settings of the clock face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaceConfig {
    /// Red added for the hour indicator.
    pub hour_value: u8,

    /// Blue added for the minute indicator.
    pub minute_value: u8,

    /// Red and green level of the quarter markers.
    pub quarter_value: u8,

    /// Lower bound of the seconds pulse.
    pub seconds_min: u8,

    /// Upper bound of the seconds pulse.
    pub seconds_max: u8,

    /// Pulse step per tick.
    pub seconds_rise: u8,

    /// Pulse period in milliseconds.
    pub pulse_period_ms: u32,
}

impl FaceConfig {
    pub const fn new() -> Self {
        Self {
            hour_value: 92,
            minute_value: 92,
            quarter_value: 16,
            seconds_min: 1,
            seconds_max: 32,
            seconds_rise: 1,
            pulse_period_ms: 1000,
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.seconds_min > self.seconds_max {
            return Err("seconds_min must be <= seconds_max");
        }
        if self.seconds_rise == 0 {
            return Err("seconds_rise must be > 0");
        }
        if self.pulse_period_ms < 4 {
            return Err("pulse_period_ms must be >= 4");
        }
        Ok(())
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self::new()
    }
}
