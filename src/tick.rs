//! One iteration of the clock's control loop.

use crate::clock::{ChangeEdges, ClockReading};
use crate::config::FaceConfig;
use crate::face::{Face, LedPositions};
use crate::ring::Frame;
use crate::rtc::{HardwareClock, Nvram};
use crate::time_source::TimeSource;

/// Outcome of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// The frame holds the face for `reading`.
    Rendered {
        reading: ClockReading,
        edges: ChangeEdges,
        positions: LedPositions,
    },
    /// The time source is down. Show the fault alarm, then call
    /// [`Clock::recover`].
    Unhealthy,
}

/// Time source, face and frame wired together.
pub struct Clock<R> {
    time: TimeSource<R>,
    face: Face,
    frame: Frame,
}

impl<R> Clock<R>
where
    R: HardwareClock + Nvram,
{
    pub fn new(time: TimeSource<R>, config: FaceConfig) -> Self {
        Self {
            time,
            face: Face::new(config),
            frame: Frame::new(),
        }
    }

    pub fn init(&mut self, now_ms: u64) {
        self.time.init(now_ms);
    }

    /// Samples the time, detects edges and renders the face.
    pub fn tick(&mut self, now_ms: u64) -> Tick {
        if !self.time.is_healthy() {
            return Tick::Unhealthy;
        }

        // A failed quarter sync still renders this tick so listeners get
        // its edges. The next tick reports the fault.
        let sampled = self.time.sample(now_ms);
        let edges = self.time.detect_change(&sampled, now_ms);

        // A DST correction re-samples, so render the latest reading.
        let reading = self.time.reading();
        let elapsed = self.time.elapsed_since_change(now_ms);
        let positions = self
            .face
            .render(&reading, edges.any_changed, elapsed, &mut self.frame);

        Tick::Rendered {
            reading,
            edges,
            positions,
        }
    }

    pub fn recover(&mut self, now_ms: u64) {
        self.time.recover(now_ms);
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn time(&self) -> &TimeSource<R> {
        &self.time
    }

    #[cfg(test)]
    pub(crate) fn time_mut(&mut self) -> &mut TimeSource<R> {
        &mut self.time
    }
}
