use std::time::Duration;

use rover_bbb_gpio::pwm::{SysfsPwm, SysfsPwmConfig};
use rover_bbb_gpio::I2cdev;
use rover_core::duty;
use rover_core::error::RoverError;
use rover_devices::devices::pca9685::PwmChannel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

//multiplicative brightness steps, floored back to ticks; compounding rounding is accepted
const STEP_UP: f64 = 1.2;
const STEP_DOWN: f64 = 0.8;

///Step-mode brightness: a direct passthrough to one chip pwm channel.
pub struct Led {
    channel: PwmChannel<I2cdev>,
}

impl Led {
    pub fn new(channel: PwmChannel<I2cdev>) -> Led {
        Led { channel }
    }

    pub fn set_duty(&self, duty: u16) -> Result<(), RoverError> {
        self.channel.set_duty(duty)?;
        Ok(())
    }
}

///Brightness up by 20%.
pub fn step_up(duty: u16) -> u16 {
    duty::clamp((duty as f64 * STEP_UP) as i64)
}

///Brightness down by 20%.
pub fn step_down(duty: u16) -> u16 {
    duty::clamp((duty as f64 * STEP_DOWN) as i64)
}

///Reflecting triangle wave over [0.0, 1.0].
pub struct Breather {
    ratio: f64,
    rising: bool,
    step: f64,
}

impl Breather {
    pub fn new(step: f64) -> Breather {
        Breather {
            ratio: 0.0,
            rising: true,
            step,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    ///Move one step, reversing direction at either bound.
    pub fn advance(&mut self) -> f64 {
        if self.rising {
            self.ratio += self.step;
            if self.ratio >= 1.0 {
                self.ratio = 1.0;
                self.rising = false;
            }
        } else {
            self.ratio -= self.step;
            if self.ratio <= 0.0 {
                self.ratio = 0.0;
                self.rising = true;
            }
        }
        self.ratio
    }
}

///Breathing mode: drive the sysfs pwm line from the same cooperative loop that
///watches for cancellation, one step per tick, until cancelled. The line is
///switched off on the way out whether the loop ended by cancellation or error.
pub async fn run_breathe(
    pwm: &SysfsPwm,
    cfg: &SysfsPwmConfig,
    cancel: CancellationToken,
) -> Result<(), RoverError> {
    let mut breather = Breather::new(cfg.step);
    pwm.enable(cfg.frequency_hz, breather.ratio())?;
    info!("breathing on pwm{} at {}Hz", pwm.channel(), cfg.frequency_hz);

    let mut tick = tokio::time::interval(Duration::from_millis(cfg.tick_ms));
    let result = loop {
        tokio::select! {
            _ = tick.tick() => {
                let ratio = breather.advance();
                match pwm.update_duty(cfg.frequency_hz, ratio) {
                    Ok(duty_ns) => debug!("duty {:.0}% ({}ns)", ratio * 100.0, duty_ns),
                    Err(err) => break Err(err),
                }
            }
            _ = cancel.cancelled() => break Ok(()),
        }
    };

    pwm.disable()?;
    info!("breathing stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::{step_down, step_up, Breather};

    #[test]
    fn breather_reflects_at_full_scale() {
        let mut breather = Breather {
            ratio: 0.95,
            rising: true,
            step: 0.05,
        };
        assert_eq!(breather.advance(), 1.0);
        assert!(breather.advance() < 1.0);
    }

    #[test]
    fn breather_reflects_at_zero() {
        let mut breather = Breather {
            ratio: 0.05,
            rising: false,
            step: 0.05,
        };
        assert_eq!(breather.advance(), 0.0);
        assert!(breather.advance() > 0.0);
    }

    #[test]
    fn breather_starts_dark_and_rising() {
        let mut breather = Breather::new(0.05);
        assert_eq!(breather.ratio(), 0.0);
        assert!(breather.advance() > 0.0);
    }

    #[test]
    fn steps_floor_and_clamp() {
        //the float products land just under the exact values, as in 2800 * 1.2
        assert_eq!(step_up(2800), 3359);
        assert_eq!(step_up(4000), 4095);
        assert_eq!(step_up(0), 0);
        assert_eq!(step_down(4095), 3276);
        assert_eq!(step_down(1), 0);
        assert_eq!(step_down(0), 0);
    }

    #[test]
    fn steps_do_not_round_trip() {
        //compounding rounding is accepted, not corrected
        let duty = 1000;
        assert_ne!(step_down(step_up(duty)), duty);
    }
}
