//! Real-time clock and battery backed RAM access.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::blocking::i2c::{Write, WriteRead};

/// A battery backed calendar clock.
pub trait HardwareClock {
    type Error;

    /// (Re)initializes the link to the clock.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Whether the oscillator is running.
    fn is_running(&mut self) -> Result<bool, Self::Error>;

    fn now(&mut self) -> Result<NaiveDateTime, Self::Error>;

    /// Sets the time and starts the oscillator.
    fn adjust(&mut self, datetime: &NaiveDateTime) -> Result<(), Self::Error>;
}

/// Byte addressed storage that survives power loss.
pub trait Nvram {
    type Error;

    fn read_byte(&mut self, address: u8) -> Result<u8, Self::Error>;

    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// Bus transfer failed.
    I2c(E),
    /// RAM address outside of the 56 available bytes.
    InvalidAddress,
    /// The registers do not hold a valid date, or the date is not representable.
    InvalidDatetime,
}

const ADDRESS: u8 = 0x68;
const REG_SECONDS: u8 = 0x00;
const REG_RAM: u8 = 0x08;
const RAM_SIZE: u8 = 56;
const CLOCK_HALT: u8 = 0x80;
const HOUR_12H_MODE: u8 = 0x40;

/// DS1307 driver over blocking I2C.
pub struct Ds1307<I2C> {
    i2c: I2C,
}

impl<I2C, E> Ds1307<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(ADDRESS, &[register], buffer)
            .map_err(Error::I2c)
    }
}

impl<I2C, E> HardwareClock for Ds1307<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Error = Error<E>;

    fn begin(&mut self) -> Result<(), Error<E>> {
        let mut seconds = [0u8; 1];
        self.read_registers(REG_SECONDS, &mut seconds)
    }

    fn is_running(&mut self) -> Result<bool, Error<E>> {
        let mut seconds = [0u8; 1];
        self.read_registers(REG_SECONDS, &mut seconds)?;
        Ok(seconds[0] & CLOCK_HALT == 0)
    }

    fn now(&mut self) -> Result<NaiveDateTime, Error<E>> {
        let mut regs = [0u8; 7];
        self.read_registers(REG_SECONDS, &mut regs)?;
        decode_datetime(&regs).ok_or(Error::InvalidDatetime)
    }

    fn adjust(&mut self, datetime: &NaiveDateTime) -> Result<(), Error<E>> {
        let regs = encode_datetime(datetime).ok_or(Error::InvalidDatetime)?;
        let mut frame = [0u8; 8];
        frame[0] = REG_SECONDS;
        frame[1..].copy_from_slice(&regs);
        self.i2c.write(ADDRESS, &frame).map_err(Error::I2c)
    }
}

impl<I2C, E> Nvram for Ds1307<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Error = Error<E>;

    fn read_byte(&mut self, address: u8) -> Result<u8, Error<E>> {
        if address >= RAM_SIZE {
            return Err(Error::InvalidAddress);
        }
        let mut value = [0u8; 1];
        self.read_registers(REG_RAM + address, &mut value)?;
        Ok(value[0])
    }

    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Error<E>> {
        if address >= RAM_SIZE {
            return Err(Error::InvalidAddress);
        }
        self.i2c
            .write(ADDRESS, &[REG_RAM + address, value])
            .map_err(Error::I2c)
    }
}

fn bcd_to_bin(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn decode_hours(value: u8) -> u8 {
    if value & HOUR_12H_MODE != 0 {
        let hour = bcd_to_bin(value & 0x1F) % 12;
        let pm = value & 0x20 != 0;
        if pm {
            hour + 12
        } else {
            hour
        }
    } else {
        bcd_to_bin(value & 0x3F)
    }
}

/// Decodes the seven time registers starting at 0x00.
fn decode_datetime(regs: &[u8; 7]) -> Option<NaiveDateTime> {
    let second = bcd_to_bin(regs[0] & 0x7F);
    let minute = bcd_to_bin(regs[1] & 0x7F);
    let hour = decode_hours(regs[2]);
    let day = bcd_to_bin(regs[4] & 0x3F);
    let month = bcd_to_bin(regs[5] & 0x1F);
    let year = 2000 + i32::from(bcd_to_bin(regs[6]));

    NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))?.and_hms_opt(
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
    )
}

/// Encodes a datetime into the seven time registers, oscillator enabled, 24h mode.
fn encode_datetime(datetime: &NaiveDateTime) -> Option<[u8; 7]> {
    let year = datetime.year();
    if !(2000..=2099).contains(&year) {
        return None;
    }

    Some([
        bin_to_bcd(datetime.second() as u8),
        bin_to_bcd(datetime.minute() as u8),
        bin_to_bcd(datetime.hour() as u8),
        datetime.weekday().number_from_sunday() as u8,
        bin_to_bcd(datetime.day() as u8),
        bin_to_bcd(datetime.month() as u8),
        bin_to_bcd((year - 2000) as u8),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Register file of a DS1307 behind a fake bus.
    struct FakeBus {
        regs: [u8; 64],
        fail: bool,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BusError;

    impl FakeBus {
        fn new() -> Self {
            Self {
                regs: [0; 64],
                fail: false,
            }
        }
    }

    impl Write for FakeBus {
        type Error = BusError;

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
            if self.fail || address != ADDRESS {
                return Err(BusError);
            }
            let start = bytes[0] as usize;
            for (i, b) in bytes[1..].iter().enumerate() {
                self.regs[start + i] = *b;
            }
            Ok(())
        }
    }

    impl WriteRead for FakeBus {
        type Error = BusError;

        fn write_read(
            &mut self,
            address: u8,
            bytes: &[u8],
            buffer: &mut [u8],
        ) -> Result<(), BusError> {
            if self.fail || address != ADDRESS {
                return Err(BusError);
            }
            let start = bytes[0] as usize;
            buffer.copy_from_slice(&self.regs[start..start + buffer.len()]);
            Ok(())
        }
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn reads_bcd_registers() {
        let mut bus = FakeBus::new();
        bus.regs[..7].copy_from_slice(&[0x30, 0x59, 0x01, 0x01, 0x26, 0x03, 0x17]);
        let mut rtc = Ds1307::new(bus);

        assert_eq!(rtc.now(), Ok(datetime(2017, 3, 26, 1, 59, 30)));
        assert_eq!(rtc.is_running(), Ok(true));
    }

    #[test]
    fn reads_twelve_hour_mode() {
        let mut bus = FakeBus::new();
        // 11 PM
        bus.regs[..7].copy_from_slice(&[0x00, 0x00, 0x40 | 0x20 | 0x11, 0x01, 0x01, 0x01, 0x20]);
        let mut rtc = Ds1307::new(bus);

        assert_eq!(rtc.now(), Ok(datetime(2020, 1, 1, 23, 0, 0)));
    }

    #[test]
    fn halted_oscillator_is_reported() {
        let mut bus = FakeBus::new();
        bus.regs[0] = CLOCK_HALT;
        let mut rtc = Ds1307::new(bus);

        assert_eq!(rtc.is_running(), Ok(false));
    }

    #[test]
    fn adjust_writes_registers_and_starts_oscillator() {
        let mut bus = FakeBus::new();
        bus.regs[0] = CLOCK_HALT;
        let mut rtc = Ds1307::new(bus);

        let when = datetime(2017, 10, 29, 2, 59, 30);
        rtc.adjust(&when).unwrap();

        assert_eq!(rtc.is_running(), Ok(true));
        assert_eq!(rtc.now(), Ok(when));
        // Sunday
        assert_eq!(rtc.release().regs[3], 1);
    }

    #[test]
    fn adjust_rejects_years_outside_register_range() {
        let mut rtc = Ds1307::new(FakeBus::new());
        let when = datetime(2100, 1, 1, 0, 0, 0);

        assert_eq!(rtc.adjust(&when), Err(Error::InvalidDatetime));
    }

    #[test]
    fn garbage_registers_are_invalid() {
        let mut bus = FakeBus::new();
        // month 0
        bus.regs[..7].copy_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x20]);
        let mut rtc = Ds1307::new(bus);

        assert_eq!(rtc.now(), Err(Error::InvalidDatetime));
    }

    #[test]
    fn ram_is_offset_and_bounded() {
        let mut rtc = Ds1307::new(FakeBus::new());
        rtc.write_byte(0, 1).unwrap();

        assert_eq!(rtc.read_byte(0), Ok(1));
        assert_eq!(rtc.read_byte(56), Err(Error::InvalidAddress));
        assert_eq!(rtc.write_byte(60, 1), Err(Error::InvalidAddress));
        assert_eq!(rtc.release().regs[REG_RAM as usize], 1);
    }

    #[test]
    fn bus_errors_propagate() {
        let mut bus = FakeBus::new();
        bus.fail = true;
        let mut rtc = Ds1307::new(bus);

        assert_eq!(rtc.begin(), Err(Error::I2c(BusError)));
        assert_eq!(rtc.is_running(), Err(Error::I2c(BusError)));
    }
}
