use std::sync::{Arc, Mutex};

use embedded_hal_0::blocking::i2c;
use rover_core::duty::DUTY_MAX;
use serde::Deserialize;
use tracing::debug;

use crate::error::DeviceError;

//register map
const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

//MODE1 values: sleep to accept configuration, restart + auto-increment + allcall to run
const MODE1_SLEEP: u8 = 0x10;
const MODE1_RUN: u8 = 0xA1;

const OSC_HZ: f64 = 25_000_000.0;
const PRESCALE_MIN: u8 = 3;

pub const CHANNELS: u8 = 16;

//system level config -- corresponds to 1 pwm chip instance
#[derive(Debug, Deserialize, Clone)]
pub struct Pca9685Config {
    pub bus: u8,
    pub address: u8,
    pub frequency_hz: f64,
    pub drive_a: u8,
    pub drive_b: u8,
    pub led: u8,
}

///Prescale register value for a target output frequency, derived from the 25MHz
///internal oscillator and clamped to the chip's minimum of 3.
pub fn prescale_for(frequency_hz: f64) -> u8 {
    let prescale = (OSC_HZ / (4096.0 * frequency_hz) - 1.0).round();
    prescale.max(PRESCALE_MIN as f64) as u8
}

///Register-level driver for the 16-channel pwm controller.
pub struct Pca9685<I2C> {
    i2c: I2C,
    address: u8,
    frequency_hz: Option<f64>,
    prescale: Option<u8>,
}

impl<I2C, E> Pca9685<I2C>
where
    E: std::fmt::Debug,
    I2C: i2c::Write<Error = E>,
{
    pub fn new(i2c: I2C, address: u8) -> Pca9685<I2C> {
        Pca9685 {
            i2c,
            address,
            frequency_hz: None,
            prescale: None,
        }
    }

    ///Program the global output frequency. Runs once per handle, before any channel
    ///operation. The prescale register only accepts writes in sleep mode, and leaving
    ///sleep resets channel state, so callers must reapply duty values afterward.
    pub fn initialize(&mut self, frequency_hz: f64) -> Result<(), DeviceError> {
        let prescale = prescale_for(frequency_hz);
        self.write_register(MODE1, MODE1_SLEEP)?;
        self.write_register(PRESCALE, prescale)?;
        self.write_register(MODE1, MODE1_RUN)?;
        self.frequency_hz = Some(frequency_hz);
        self.prescale = Some(prescale);
        debug!(
            "pca9685 at 0x{:02x} running at {}Hz (prescale {})",
            self.address, frequency_hz, prescale
        );
        Ok(())
    }

    pub fn frequency_hz(&self) -> Option<f64> {
        self.frequency_hz
    }

    pub fn prescale(&self) -> Option<u8> {
        self.prescale
    }

    ///Write one channel's 4-byte on/off block as a single auto-increment transaction.
    ///High bytes carry only the low nibble.
    pub fn set_channel_on_off(&mut self, channel: u8, on: u16, off: u16) -> Result<(), DeviceError> {
        if channel >= CHANNELS {
            return Err(DeviceError::InvalidChannel(channel));
        }
        if self.prescale.is_none() {
            return Err(DeviceError::NotInitialized);
        }
        let base = LED0_ON_L + 4 * channel;
        self.i2c
            .write(
                self.address,
                &[
                    base,
                    (on & 0xFF) as u8,
                    ((on >> 8) & 0x0F) as u8,
                    (off & 0xFF) as u8,
                    ((off >> 8) & 0x0F) as u8,
                ],
            )
            .map_err(|err| DeviceError::I2c(format!("pca9685 write failed: {:?}", err)))
    }

    ///Encode a duty as the chip's on/off pulse pair. 0 is the full-off encoding,
    ///4095 the full-on encoding, anything between starts at tick 0 and switches off
    ///at `duty`. Out-of-range input clamps. No retries; a failed write leaves the
    ///channel's prior pulse state in effect.
    pub fn set_channel_duty(&mut self, channel: u8, duty: u16) -> Result<(), DeviceError> {
        let duty = duty.min(DUTY_MAX);
        match duty {
            0 => self.set_channel_on_off(channel, 0, 0),
            DUTY_MAX => self.set_channel_on_off(channel, 0, DUTY_MAX),
            proportional => self.set_channel_on_off(channel, 0, proportional),
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), DeviceError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|err| DeviceError::I2c(format!("pca9685 write failed: {:?}", err)))
    }
}

///One channel of a shared chip handle. The handle is shared by reference among all
///channels created against it and must outlive them.
pub struct PwmChannel<I2C> {
    device: Arc<Mutex<Pca9685<I2C>>>,
    channel: u8,
}

impl<I2C> Clone for PwmChannel<I2C> {
    fn clone(&self) -> Self {
        PwmChannel {
            device: self.device.clone(),
            channel: self.channel,
        }
    }
}

impl<I2C, E> PwmChannel<I2C>
where
    E: std::fmt::Debug,
    I2C: i2c::Write<Error = E>,
{
    pub fn new(device: Arc<Mutex<Pca9685<I2C>>>, channel: u8) -> Result<PwmChannel<I2C>, DeviceError> {
        if channel >= CHANNELS {
            return Err(DeviceError::InvalidChannel(channel));
        }
        Ok(PwmChannel { device, channel })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn set_duty(&self, duty: u16) -> Result<(), DeviceError> {
        let mut device = match self.device.lock() {
            Ok(device) => device,
            Err(poisoned) => poisoned.into_inner(),
        };
        device.set_channel_duty(self.channel, duty)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use embedded_hal_0::blocking::i2c;

    use super::{prescale_for, Pca9685, PwmChannel};
    use crate::error::DeviceError;

    //bus double that records every (address, bytes) write
    struct MockBus {
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl i2c::Write for MockBus {
        type Error = ();

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), ()> {
            self.writes.push((addr, bytes.to_vec()));
            Ok(())
        }
    }

    fn chip() -> Pca9685<MockBus> {
        Pca9685::new(MockBus { writes: Vec::new() }, 0x40)
    }

    #[test]
    fn prescale_rounds_from_the_oscillator() {
        assert_eq!(prescale_for(1000.0), 5);
        assert_eq!(prescale_for(50.0), 121);
    }

    #[test]
    fn prescale_clamps_at_the_hardware_minimum() {
        assert_eq!(prescale_for(1_000_000.0), 3);
    }

    #[test]
    fn initialize_sleeps_programs_prescale_and_restarts() {
        let mut dev = chip();
        dev.initialize(1000.0).unwrap();
        assert_eq!(
            dev.i2c.writes,
            vec![
                (0x40, vec![0x00, 0x10]),
                (0x40, vec![0xFE, 5]),
                (0x40, vec![0x00, 0xA1]),
            ]
        );
        assert_eq!(dev.prescale(), Some(5));
        assert_eq!(dev.frequency_hz(), Some(1000.0));
    }

    #[test]
    fn duty_has_exactly_three_encodings() {
        let mut dev = chip();
        dev.initialize(1000.0).unwrap();
        dev.i2c.writes.clear();

        dev.set_channel_duty(0, 0).unwrap();
        dev.set_channel_duty(0, 4095).unwrap();
        dev.set_channel_duty(8, 2800).unwrap();

        assert_eq!(
            dev.i2c.writes,
            vec![
                (0x40, vec![0x06, 0x00, 0x00, 0x00, 0x00]),
                (0x40, vec![0x06, 0x00, 0x00, 0xFF, 0x0F]),
                (0x40, vec![0x26, 0x00, 0x00, 0xF0, 0x0A]),
            ]
        );
    }

    #[test]
    fn duty_clamps_into_range() {
        let mut dev = chip();
        dev.initialize(1000.0).unwrap();
        dev.i2c.writes.clear();

        dev.set_channel_duty(1, 5000).unwrap();
        assert_eq!(dev.i2c.writes, vec![(0x40, vec![0x0A, 0x00, 0x00, 0xFF, 0x0F])]);
    }

    #[test]
    fn channels_are_bounded() {
        let mut dev = chip();
        dev.initialize(1000.0).unwrap();
        assert_eq!(
            dev.set_channel_on_off(16, 0, 0),
            Err(DeviceError::InvalidChannel(16))
        );
    }

    #[test]
    fn channel_use_requires_initialize() {
        let mut dev = chip();
        assert_eq!(
            dev.set_channel_duty(0, 100),
            Err(DeviceError::NotInitialized)
        );
    }

    #[test]
    fn channels_share_one_handle() {
        let mut dev = chip();
        dev.initialize(1000.0).unwrap();
        dev.i2c.writes.clear();

        let device = Arc::new(Mutex::new(dev));
        let a = PwmChannel::new(device.clone(), 0).unwrap();
        let b = PwmChannel::new(device.clone(), 1).unwrap();
        a.set_duty(3200).unwrap();
        b.set_duty(3200).unwrap();

        let dev = device.lock().unwrap();
        assert_eq!(
            dev.i2c.writes,
            vec![
                (0x40, vec![0x06, 0x00, 0x00, 0x80, 0x0C]),
                (0x40, vec![0x0A, 0x00, 0x00, 0x80, 0x0C]),
            ]
        );
    }
}
