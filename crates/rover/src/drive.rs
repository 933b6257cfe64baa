use rover_bbb_gpio::gpio::GpioLine;
use rover_bbb_gpio::I2cdev;
use rover_core::duty::DUTY_MAX;
use rover_core::error::RoverError;
use rover_devices::devices::pca9685::PwmChannel;
use tracing::debug;

use crate::config::DrivePinsConfig;

///Named maneuvers for the dual H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    Forward,
    Reverse,
    Left,
    Right,
    Stop,
}

impl Maneuver {
    ///Signal vector over (STBY, AIN1, AIN2, BIN1, BIN2).
    pub fn signals(&self) -> [bool; 5] {
        match self {
            Maneuver::Forward => [true, true, false, true, false],
            Maneuver::Reverse => [true, false, true, false, true],
            Maneuver::Left => [true, true, false, false, true],
            Maneuver::Right => [true, false, true, true, false],
            Maneuver::Stop => [false, false, false, false, false],
        }
    }
}

///Owns the five direction lines and the two drive pwm channels.
///Direction and speed are independent: a maneuver never touches the duty and vice versa.
pub struct Drive {
    lines: [GpioLine; 5],
    speed_a: PwmChannel<I2cdev>,
    speed_b: PwmChannel<I2cdev>,
    maneuver: Maneuver,
}

impl Drive {
    ///Configure all five lines and take ownership of the drive channels.
    ///A failure here is fatal; the caller aborts before the interactive loop.
    pub fn try_build(
        pins: &DrivePinsConfig,
        speed_a: PwmChannel<I2cdev>,
        speed_b: PwmChannel<I2cdev>,
    ) -> Result<Drive, RoverError> {
        let mut lines = [
            GpioLine::new("STBY", &pins.standby),
            GpioLine::new("AIN1", &pins.ain1),
            GpioLine::new("AIN2", &pins.ain2),
            GpioLine::new("BIN1", &pins.bin1),
            GpioLine::new("BIN2", &pins.bin2),
        ];
        for line in lines.iter_mut() {
            line.configure()?;
        }
        Ok(Drive {
            lines,
            speed_a,
            speed_b,
            maneuver: Maneuver::Stop,
        })
    }

    ///Apply a maneuver's signal vector across the lines, in line order.
    ///The five writes are not atomic across lines; hardware may observe a
    ///mid-transition vector. There is no interlock against reversing while the
    ///bridge is energized.
    pub fn apply(&mut self, maneuver: Maneuver) -> Result<(), RoverError> {
        for (line, high) in self.lines.iter().zip(maneuver.signals()) {
            line.set_level(high)?;
        }
        self.maneuver = maneuver;
        debug!("applied {:?}", maneuver);
        Ok(())
    }

    ///The last maneuver applied.
    pub fn maneuver(&self) -> Maneuver {
        self.maneuver
    }

    ///Write the same duty to both drive channels. There is no independent
    ///left/right speed.
    pub fn set_speed(&mut self, duty: u16) -> Result<(), RoverError> {
        let duty = duty.min(DUTY_MAX);
        self.speed_a.set_duty(duty)?;
        self.speed_b.set_duty(duty)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Maneuver;

    #[test]
    fn maneuver_table() {
        assert_eq!(Maneuver::Forward.signals(), [true, true, false, true, false]);
        assert_eq!(Maneuver::Reverse.signals(), [true, false, true, false, true]);
        assert_eq!(Maneuver::Left.signals(), [true, true, false, false, true]);
        assert_eq!(Maneuver::Right.signals(), [true, false, true, true, false]);
        assert_eq!(Maneuver::Stop.signals(), [false, false, false, false, false]);
    }

    #[test]
    fn maneuvers_are_idempotent() {
        for maneuver in [
            Maneuver::Forward,
            Maneuver::Reverse,
            Maneuver::Left,
            Maneuver::Right,
            Maneuver::Stop,
        ] {
            assert_eq!(maneuver.signals(), maneuver.signals());
        }
    }

    #[test]
    fn standby_is_deasserted_only_when_stopped() {
        for maneuver in [
            Maneuver::Forward,
            Maneuver::Reverse,
            Maneuver::Left,
            Maneuver::Right,
        ] {
            assert!(maneuver.signals()[0]);
        }
        assert!(!Maneuver::Stop.signals()[0]);
    }
}
