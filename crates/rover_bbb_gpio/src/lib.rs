//!This library provides access to the BeagleBone header pins. It talks to the kernel's
//!sysfs gpio and pwm interfaces directly and shells out to `config-pin` for header multiplexing.
//!
//! The `open_bus` function gets an I2C bus instance that can be used to construct drivers in `rover_devices`

//internal helper for the header pin multiplexer
pub mod pinmux;

//digital output lines over /sys/class/gpio
pub mod gpio;

//pwm channels over /sys/class/pwm
pub mod pwm;

pub use linux_embedded_hal::I2cdev;

use rover_core::error::RoverError;

//get i2c bus by id
pub fn open_bus(bus: u8) -> Result<I2cdev, RoverError> {
    let path = format!("/dev/i2c-{}", bus);
    I2cdev::new(&path)
        .map_err(|err| RoverError::Config(format!("error opening {}: {:?}", path, err)))
}
