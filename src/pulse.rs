use crate::config::FaceConfig;

/// Triangle wave driving the brightness of the seconds indicator.
///
/// Rises by one step per tick for the first three quarters of every period
/// after a time change and falls during the last quarter.
#[derive(Clone, Debug)]
pub struct Pulse {
    amplitude: u8,
    min: u8,
    max: u8,
    rise: u8,
    period_ms: u32,
}

impl Pulse {
    /// An inverted range collapses to `seconds_min`.
    pub fn new(config: &FaceConfig) -> Self {
        Self {
            amplitude: config.seconds_min,
            min: config.seconds_min,
            max: config.seconds_max.max(config.seconds_min),
            rise: config.seconds_rise,
            period_ms: config.pulse_period_ms.max(1),
        }
    }

    pub fn amplitude(&self) -> u8 {
        self.amplitude
    }

    /// Advances the wave by one tick and returns the new amplitude.
    ///
    /// `elapsed_ms` is the time since the last change edge.
    pub fn update(&mut self, changed: bool, elapsed_ms: u32) -> u8 {
        if changed {
            self.amplitude = self.min;
            return self.amplitude;
        }

        let phase = elapsed_ms % self.period_ms;
        let next = if phase > self.period_ms / 4 * 3 {
            self.amplitude.saturating_sub(self.rise)
        } else {
            self.amplitude.saturating_add(self.rise)
        };
        self.amplitude = next.clamp(self.min, self.max);
        self.amplitude
    }
}
