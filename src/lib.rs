//! Time keeping and face rendering for a 12 LED ring clock.
//!
//! [`time_source::TimeSource`] keeps the time (RTC, free running counter,
//! daylight saving) and reports change edges; [`face::Face`] turns readings
//! into colours on the ring; [`tick::Clock`] runs both once per loop
//! iteration.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod clock;
pub mod config;
pub mod dst;
pub mod face;
pub mod pulse;
pub mod ring;
pub mod rtc;
pub mod speech;
pub mod tick;
pub mod time_source;

pub use clock::{ChangeEdges, ChangeListener, ClockReading, FiveMinuteEdge};
pub use face::{Face, LedPositions, Overlaps};
pub use ring::{Frame, LedRing};
pub use tick::{Clock, Tick};
pub use time_source::TimeSource;
