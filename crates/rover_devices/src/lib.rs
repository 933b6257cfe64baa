//!Drivers for the i2c devices on the rover. Each driver is generic over an
//!`embedded-hal` blocking bus so it can run against the real bus or a test double.

pub mod devices;
pub mod error;
