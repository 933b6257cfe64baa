use rover_core::error::RoverError;

///Error type for the device drivers.
#[derive(Debug, PartialEq, Eq)]
pub enum DeviceError {
    ///a bus transaction failed; the device keeps whatever state it last latched
    I2c(String),
    ///channel index outside the device's range
    InvalidChannel(u8),
    ///a channel operation before the one-time frequency programming
    NotInitialized,
}

impl From<DeviceError> for RoverError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::I2c(message) => RoverError::Io(message),
            DeviceError::InvalidChannel(channel) => {
                RoverError::Config(format!("invalid pwm channel: {}", channel))
            }
            DeviceError::NotInitialized => {
                RoverError::Config("pwm chip used before initialize".to_string())
            }
        }
    }
}
