//! Authoritative time, DST bookkeeping and change detection.

use chrono::{NaiveDateTime, TimeDelta};

use crate::clock::{ChangeEdges, ClockReading};
use crate::config::DST_NVRAM_ADDRESS;
use crate::dst;
use crate::rtc::{HardwareClock, Nvram};

/// Free running clock anchored on the last good RTC read.
#[derive(Clone, Copy, Debug)]
struct SoftClock {
    anchor: NaiveDateTime,
    anchor_ms: u64,
}

impl SoftClock {
    fn new(anchor: NaiveDateTime, anchor_ms: u64) -> Self {
        Self { anchor, anchor_ms }
    }

    fn now(&self, now_ms: u64) -> NaiveDateTime {
        let elapsed = now_ms.saturating_sub(self.anchor_ms).min(i64::MAX as u64) as i64;
        self.anchor
            .checked_add_signed(TimeDelta::milliseconds(elapsed))
            .unwrap_or(self.anchor)
    }
}

/// The clock's notion of "now".
///
/// Reads go to a free running counter that is re-seeded from the hardware
/// clock at start, on every quarter and on recovery. The hardware clock is
/// only written for DST corrections.
pub struct TimeSource<R> {
    rtc: R,
    soft: SoftClock,
    now: NaiveDateTime,
    reading: ClockReading,
    previous: ClockReading,
    last_change_ms: u64,
    healthy: bool,
    dst: bool,
}

impl<R> TimeSource<R>
where
    R: HardwareClock + Nvram,
{
    /// `fallback` is written to the hardware clock if it is found halted.
    pub fn new(rtc: R, fallback: NaiveDateTime) -> Self {
        let reading = ClockReading::from_datetime(&fallback);
        Self {
            rtc,
            soft: SoftClock::new(fallback, 0),
            now: fallback,
            reading,
            previous: reading,
            last_change_ms: 0,
            healthy: false,
            dst: false,
        }
    }

    pub fn init(&mut self, now_ms: u64) {
        info!("Initializing RTC...");

        match self.rtc.is_running() {
            Ok(true) => {}
            Ok(false) => {
                warn!("RTC halted; starting it at the fallback time");
                if self.rtc.adjust(&self.soft.anchor).is_err() {
                    error!("Failed to start the RTC");
                }
            }
            Err(_) => error!("RTC not responding"),
        }

        self.sync(now_ms);
        if self.healthy {
            self.infer_dst(now_ms);
        }
        self.sample(now_ms);
        self.mark_previous(now_ms);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn is_dst(&self) -> bool {
        self.dst
    }

    /// Full date and time of the last sample.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn reading(&self) -> ClockReading {
        self.reading
    }

    /// Tick time of the last change edge.
    #[cfg(test)]
    pub(crate) fn last_change_ms(&self) -> u64 {
        self.last_change_ms
    }

    pub fn elapsed_since_change(&self, now_ms: u64) -> u32 {
        now_ms
            .saturating_sub(self.last_change_ms)
            .min(u64::from(u32::MAX)) as u32
    }

    #[cfg(test)]
    pub(crate) fn rtc(&self) -> &R {
        &self.rtc
    }

    #[cfg(test)]
    pub(crate) fn rtc_mut(&mut self) -> &mut R {
        &mut self.rtc
    }

    /// Current reading from the free running counter.
    ///
    /// Keeps advancing from the last good RTC read while the RTC is down.
    pub fn sample(&mut self, now_ms: u64) -> ClockReading {
        self.now = self.soft.now(now_ms);
        self.reading = ClockReading::from_datetime(&self.now);
        self.reading
    }

    /// Checks the hardware clock and re-seeds the free running counter.
    pub fn sync(&mut self, now_ms: u64) {
        self.healthy = match self.rtc.is_running() {
            Ok(true) => true,
            Ok(false) => {
                warn!("RTC is not running anymore!");
                false
            }
            Err(_) => {
                error!("RTC read failed");
                false
            }
        };
        if !self.healthy {
            return;
        }

        match self.rtc.now() {
            Ok(datetime) => {
                debug!("RTC is ok; syncing");
                self.soft = SoftClock::new(datetime, now_ms);
                self.now = datetime;
            }
            Err(_) => {
                error!("RTC returned an invalid time");
                self.healthy = false;
            }
        }
    }

    /// Re-initializes the hardware clock after a failure.
    pub fn recover(&mut self, now_ms: u64) {
        info!("Resetting RTC");
        if self.rtc.begin().is_err() {
            error!("RTC still not responding");
        }
        if let Ok(false) = self.rtc.is_running() {
            // Restart a halted oscillator from the free running estimate.
            warn!("RTC halted; restarting it from the internal clock");
            if self.rtc.adjust(&self.soft.now(now_ms)).is_err() {
                error!("Failed to restart the RTC");
            }
        }

        self.sync(now_ms);
        if self.healthy {
            self.infer_dst(now_ms);
        }
        self.sample(now_ms);
        self.mark_previous(now_ms);
    }

    /// Edge detection against the previous reading.
    ///
    /// Hour edges also run the DST check, quarter edges re-sync with the RTC.
    pub fn detect_change(&mut self, reading: &ClockReading, now_ms: u64) -> ChangeEdges {
        let edges = ChangeEdges::between(&self.previous, reading);

        if edges.any_changed {
            self.previous = *reading;
            self.last_change_ms = now_ms;
        }
        if edges.hour_changed {
            self.check_dst_transition(now_ms);
        }
        if edges.quarter_changed() {
            self.sync(now_ms);
        }

        edges
    }

    /// Applies the clock change if this is the switch hour.
    pub fn check_dst_transition(&mut self, now_ms: u64) {
        let Some(transition) = dst::due_transition(&self.now, self.dst) else {
            return;
        };

        match transition {
            dst::Transition::ToWinter => info!("Adjusting time to match winter time now"),
            dst::Transition::ToSummer => info!("Adjusting time to match summer time now"),
        }
        if !self.shift_clock(transition.offset_hours(), now_ms) {
            return;
        }

        self.dst = transition.resulting_dst();
        self.persist_dst();
        self.sample(now_ms);
        self.mark_previous(now_ms);
    }

    /// Derives DST from the date and reconciles it with the stored flag.
    pub fn infer_dst(&mut self, now_ms: u64) {
        let inferred = dst::infer(&self.soft.now(now_ms));
        if inferred {
            info!("We are in summer time now");
        } else {
            info!("We are in winter time now");
        }

        let stored = match self.rtc.read_byte(DST_NVRAM_ADDRESS) {
            Ok(0) => Some(false),
            Ok(1) => Some(true),
            Ok(_) => None,
            Err(_) => {
                error!("Failed to read the stored DST flag");
                None
            }
        };
        self.dst = inferred;

        match stored {
            Some(stored) if stored == inferred => {
                info!("Stored DST flag agrees with the current time");
            }
            Some(_) => {
                let offset = if inferred { 1 } else { -1 };
                info!("Stored DST flag disagrees; moving the RTC {} hour", offset);
                if self.shift_clock(offset, now_ms) {
                    self.persist_dst();
                }
            }
            None => {
                warn!("No stored DST flag; trusting the RTC");
                self.persist_dst();
            }
        }
    }

    /// Moves both the hardware clock and the free running counter.
    fn shift_clock(&mut self, hours: i64, now_ms: u64) -> bool {
        let target = TimeDelta::try_hours(hours)
            .and_then(|delta| self.soft.now(now_ms).checked_add_signed(delta));
        let Some(target) = target else {
            return false;
        };

        match self.rtc.adjust(&target) {
            Ok(()) => {
                self.soft = SoftClock::new(target, now_ms);
                self.now = target;
                true
            }
            Err(_) => {
                error!("Failed to adjust the RTC");
                self.healthy = false;
                false
            }
        }
    }

    fn persist_dst(&mut self) {
        debug!("Writing the DST state");
        if self
            .rtc
            .write_byte(DST_NVRAM_ADDRESS, u8::from(self.dst))
            .is_err()
        {
            error!("Failed to store the DST flag");
        }
    }

    fn mark_previous(&mut self, now_ms: u64) {
        self.previous = self.reading;
        self.last_change_ms = now_ms;
    }
}
