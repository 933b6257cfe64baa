//!A mod for the error types
use std::fmt::{Debug, Display, Formatter};
use std::io;

///Common error type for rover hardware operations.
pub enum RoverError {
    ///pin mux, export, direction or bus setup failure. Fatal during startup.
    Config(String),
    ///a single device-file or bus transaction failed
    Io(String),
    ///a sysfs node did not appear within the polling bound
    Timeout(String),
}

impl RoverError {
    pub fn config(msg: &str) -> Self {
        RoverError::Config(msg.to_string())
    }
    pub fn io(msg: &str) -> Self {
        RoverError::Io(msg.to_string())
    }
    pub fn timeout(msg: &str) -> Self {
        RoverError::Timeout(msg.to_string())
    }
}

impl Debug for RoverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => f.write_fmt(format_args!("RoverError (config): {}", message)),
            Self::Io(message) => f.write_fmt(format_args!("RoverError (io): {}", message)),
            Self::Timeout(message) => f.write_fmt(format_args!("RoverError (timeout): {}", message)),
        }
    }
}

impl Display for RoverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) | Self::Io(message) | Self::Timeout(message) => {
                f.write_str(message)
            }
        }
    }
}

impl From<io::Error> for RoverError {
    fn from(err: io::Error) -> Self {
        RoverError::Io(format!("{}", err))
    }
}
