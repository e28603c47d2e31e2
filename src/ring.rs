//! LED ring frame buffer and output.

use smart_leds::{brightness, SmartLedsWrite, RGB8};

use crate::config::{ALARM_STEPS, RING_SIZE};

pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// In-memory colours for every LED on the ring.
///
/// Writes are buffered here and only reach the LEDs on [`LedRing::flush`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    leds: [RGB8; RING_SIZE],
}

impl Frame {
    pub const fn new() -> Self {
        Self {
            leds: [BLACK; RING_SIZE],
        }
    }

    pub const fn len(&self) -> usize {
        RING_SIZE
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Positions outside the ring are ignored.
    pub fn set(&mut self, position: usize, color: RGB8) {
        if let Some(led) = self.leds.get_mut(position) {
            *led = color;
        }
    }

    /// Adds to the stored colour, saturating each channel.
    pub fn add(&mut self, position: usize, color: RGB8) {
        if let Some(led) = self.leds.get_mut(position) {
            led.r = led.r.saturating_add(color.r);
            led.g = led.g.saturating_add(color.g);
            led.b = led.b.saturating_add(color.b);
        }
    }

    pub fn get(&self, position: usize) -> RGB8 {
        self.leds.get(position).copied().unwrap_or(BLACK)
    }

    pub fn clear(&mut self) {
        self.leds = [BLACK; RING_SIZE];
    }

    pub fn iter(&self) -> impl Iterator<Item = RGB8> + '_ {
        self.leds.iter().copied()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// The physical ring behind a smart LED driver.
pub struct LedRing<W> {
    writer: W,
    brightness: u8,
}

impl<W> LedRing<W>
where
    W: SmartLedsWrite<Color = RGB8>,
{
    pub fn new(writer: W, brightness: u8) -> Self {
        Self { writer, brightness }
    }

    /// Pushes the buffered frame to the LEDs.
    pub fn flush(&mut self, frame: &Frame) -> Result<(), W::Error> {
        self.writer.write(brightness(frame.iter(), self.brightness))
    }

    /// Shows one colour on every LED, bypassing the frame buffer.
    pub fn show_solid(&mut self, color: RGB8) -> Result<(), W::Error> {
        self.writer.write(brightness(
            core::iter::repeat(color).take(RING_SIZE),
            self.brightness,
        ))
    }

    pub fn off(&mut self) -> Result<(), W::Error> {
        self.show_solid(BLACK)
    }

    pub fn release(self) -> W {
        self.writer
    }
}

/// Colours of the fault alarm shown while the time source is down.
///
/// Alternates white-ish and red, one colour per alarm step.
pub fn fault_alarm() -> impl Iterator<Item = RGB8> {
    (0..ALARM_STEPS).map(|step| {
        if step % 2 == 0 {
            RGB8::new(160, 255, 255)
        } else {
            RGB8::new(255, 0, 0)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<RGB8>>,
    }

    impl SmartLedsWrite for Recorder {
        type Error = ();
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), ()>
        where
            T: IntoIterator<Item = I>,
            I: Into<RGB8>,
        {
            self.writes.push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    #[test]
    fn add_saturates() {
        let mut frame = Frame::new();
        frame.set(3, RGB8::new(200, 0, 10));
        frame.add(3, RGB8::new(100, 5, 10));

        assert_eq!(frame.get(3), RGB8::new(255, 5, 20));
    }

    #[test]
    fn out_of_range_positions_are_ignored() {
        let mut frame = Frame::new();
        frame.set(RING_SIZE, RGB8::new(1, 1, 1));
        frame.add(RING_SIZE + 4, RGB8::new(1, 1, 1));

        assert_eq!(frame, Frame::new());
        assert_eq!(frame.get(RING_SIZE), BLACK);
    }

    #[test]
    fn flush_scales_by_brightness() {
        let mut frame = Frame::new();
        frame.set(0, RGB8::new(255, 128, 0));
        let mut ring = LedRing::new(Recorder::default(), 128);
        ring.flush(&frame).unwrap();

        let writes = ring.release().writes;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), RING_SIZE);
        assert!(writes[0][0].r < 255 && writes[0][0].r > 100);
        assert_eq!(writes[0][1], BLACK);
    }

    #[test]
    fn solid_fills_the_ring() {
        let mut ring = LedRing::new(Recorder::default(), 255);
        ring.show_solid(RGB8::new(255, 0, 0)).unwrap();

        let writes = ring.release().writes;
        assert_eq!(writes[0].len(), RING_SIZE);
        assert!(writes[0].iter().all(|c| c.r > 0 && c.g == 0 && c.b == 0));
    }

    #[test]
    fn alarm_alternates() {
        let colors: Vec<RGB8> = fault_alarm().collect();
        assert_eq!(colors.len(), ALARM_STEPS as usize);
        assert_eq!(colors[0], RGB8::new(160, 255, 255));
        assert_eq!(colors[1], RGB8::new(255, 0, 0));
        assert_ne!(colors[2], colors[3]);
    }
}
