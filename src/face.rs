//! Clock face rendering onto the LED ring.
//!
//! Hour is red, minute is blue and the second is a pulsing green. Indicators
//! on different channels mix additively; when two of them would fight over
//! the same LED they take turns instead.

use smart_leds::RGB8;

use crate::clock::ClockReading;
use crate::config::{FaceConfig, RING_SIZE};
use crate::pulse::Pulse;
use crate::ring::{Frame, BLACK};

/// Ring index of every indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedPositions {
    pub hour: usize,
    pub minute: usize,
    pub second: usize,
}

impl LedPositions {
    pub fn from_reading(reading: &ClockReading) -> Self {
        Self {
            hour: usize::from(reading.hour()),
            minute: bucket_to_ring(reading.five_minute()),
            second: bucket_to_ring(reading.five_second()),
        }
    }

    pub fn overlaps(&self) -> Overlaps {
        Overlaps {
            hour_minute: self.hour == self.minute,
            minute_second: self.minute == self.second,
            second_hour: self.second == self.hour,
        }
    }

    pub fn is_occupied(&self, position: usize) -> bool {
        position == self.hour || position == self.minute || position == self.second
    }
}

/// Maps a 0..=55 five step bucket onto the ring.
fn bucket_to_ring(bucket: u8) -> usize {
    usize::from(bucket / 5) % RING_SIZE
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overlaps {
    pub hour_minute: bool,
    pub minute_second: bool,
    pub second_hour: bool,
}

impl Overlaps {
    /// All three indicators share one LED.
    pub fn triple(&self) -> bool {
        self.hour_minute && self.minute_second
    }
}

/// Renders readings into frames. Owns the seconds pulse.
pub struct Face {
    config: FaceConfig,
    pulse: Pulse,
}

impl Face {
    pub fn new(config: FaceConfig) -> Self {
        if let Err(reason) = config.validate() {
            warn!("Invalid face config: {}", reason);
        }
        Self {
            pulse: Pulse::new(&config),
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn pulse_amplitude(&self) -> u8 {
        self.pulse.amplitude()
    }

    /// Renders one tick.
    ///
    /// `changed` is the change edge of this tick and `elapsed_ms` the time
    /// since the last change.
    pub fn render(
        &mut self,
        reading: &ClockReading,
        changed: bool,
        elapsed_ms: u32,
        frame: &mut Frame,
    ) -> LedPositions {
        let positions = LedPositions::from_reading(reading);
        let overlaps = positions.overlaps();
        let pulse = self.pulse.update(changed, elapsed_ms);

        self.render_background(&positions, frame);
        self.render_hour(reading, &positions, &overlaps, pulse, frame);
        self.render_minute(reading, &positions, &overlaps, pulse, frame);
        self.render_second(reading, &positions, &overlaps, pulse, frame);

        positions
    }

    /// Dim quarter markers on free quarter positions, black everywhere else.
    pub fn render_background(&self, positions: &LedPositions, frame: &mut Frame) {
        let q = self.config.quarter_value;
        for i in 0..RING_SIZE {
            if i % 3 == 0 && !positions.is_occupied(i) {
                frame.set(i, RGB8::new(q, q, 0));
            } else {
                frame.set(i, BLACK);
            }
        }
    }

    pub fn render_hour(
        &self,
        reading: &ClockReading,
        positions: &LedPositions,
        overlaps: &Overlaps,
        pulse: u8,
        frame: &mut Frame,
    ) {
        let red = if overlaps.hour_minute {
            // Odd seconds belong to the hour
            (!reading.is_even_second()).then_some(pulse)
        } else if overlaps.second_hour {
            (reading.bucket_offset() % 2 != 0).then_some(pulse)
        } else {
            Some(self.config.hour_value)
        };

        if let Some(red) = red {
            frame.add(positions.hour, RGB8::new(red, 0, 0));
        }
    }

    pub fn render_minute(
        &self,
        reading: &ClockReading,
        positions: &LedPositions,
        overlaps: &Overlaps,
        pulse: u8,
        frame: &mut Frame,
    ) {
        let blue = if overlaps.hour_minute {
            reading.is_even_second().then_some(pulse)
        } else if overlaps.minute_second {
            (reading.bucket_offset() % 2 != 0).then_some(pulse)
        } else {
            Some(self.config.minute_value)
        };

        if let Some(blue) = blue {
            frame.add(positions.minute, RGB8::new(0, 0, blue));
        }
    }

    pub fn render_second(
        &self,
        reading: &ClockReading,
        positions: &LedPositions,
        overlaps: &Overlaps,
        pulse: u8,
        frame: &mut Frame,
    ) {
        if overlaps.triple() {
            return;
        }

        let shared = overlaps.second_hour || overlaps.minute_second;
        if !shared || reading.bucket_offset() % 2 == 0 {
            frame.add(positions.second, RGB8::new(0, pulse, 0));
        }
    }
}

impl Default for Face {
    fn default() -> Self {
        Self::new(FaceConfig::default())
    }
}
