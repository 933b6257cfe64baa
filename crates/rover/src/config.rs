use config_rs::{Config, File};
use rover_bbb_gpio::gpio::PinConfig;
use rover_bbb_gpio::pwm::SysfsPwmConfig;
use rover_core::error::RoverError;
use rover_devices::devices::pca9685::{Pca9685Config, CHANNELS};
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
pub struct Metadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

///The five H-bridge control lines, named after the driver's inputs.
#[derive(Deserialize, Debug)]
pub struct DrivePinsConfig {
    pub standby: PinConfig,
    pub ain1: PinConfig,
    pub ain2: PinConfig,
    pub bin1: PinConfig,
    pub bin2: PinConfig,
}

fn default_initial_speed() -> u16 {
    2800
}

#[derive(Deserialize, Debug)]
pub struct SessionConfig {
    #[serde(default = "default_initial_speed")]
    pub initial_speed: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            initial_speed: default_initial_speed(),
        }
    }
}

///Everything the binary needs, deserialized from one yaml file and passed down
///to constructors. Nothing reads ambient module state.
#[derive(Deserialize, Debug)]
pub struct RoverConfig {
    #[serde(default)]
    pub metadata: Metadata,
    pub pins: DrivePinsConfig,
    pub pwm_chip: Pca9685Config,
    pub led_pwm: Option<SysfsPwmConfig>,
    #[serde(default)]
    pub session: SessionConfig,
}

impl RoverConfig {
    pub fn load(path: &str) -> Result<RoverConfig, RoverError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .build()
            .and_then(|config| config.try_deserialize::<RoverConfig>())
            .map_err(|err| RoverError::Config(format!("failed to load {}: {}", path, err)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RoverError> {
        if self.pwm_chip.frequency_hz <= 0.0 {
            return Err(RoverError::Config(format!(
                "pwm_chip.frequency_hz must be positive, got {}",
                self.pwm_chip.frequency_hz
            )));
        }
        for (name, channel) in [
            ("drive_a", self.pwm_chip.drive_a),
            ("drive_b", self.pwm_chip.drive_b),
            ("led", self.pwm_chip.led),
        ] {
            if channel >= CHANNELS {
                return Err(RoverError::Config(format!(
                    "pwm_chip.{} channel out of range: {}",
                    name, channel
                )));
            }
        }
        if let Some(ref led_pwm) = self.led_pwm {
            if led_pwm.frequency_hz == 0 {
                return Err(RoverError::Config(
                    "led_pwm.frequency_hz must be positive".to_string(),
                ));
            }
            if led_pwm.step <= 0.0 || led_pwm.step > 1.0 {
                return Err(RoverError::Config(format!(
                    "led_pwm.step must be in (0, 1], got {}",
                    led_pwm.step
                )));
            }
        }
        Ok(())
    }
}
