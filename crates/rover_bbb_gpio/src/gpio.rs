use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use rover_core::error::RoverError;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pinmux;

const GPIO_ROOT: &str = "/sys/class/gpio";

///One header pin and the kernel gpio line behind it.
#[derive(Debug, Deserialize, Clone)]
pub struct PinConfig {
    pub header: String,
    pub line: u32,
}

///Result of an export request.
#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported,
    AlreadyExported,
}

///A digital output line. `configure` must run before any level write.
///Lines live for the process lifetime; there is no unexport.
pub struct GpioLine {
    name: String,
    header: String,
    line: u32,
    configured: bool,
}

impl GpioLine {
    pub fn new(name: &str, cfg: &PinConfig) -> GpioLine {
        GpioLine {
            name: name.to_string(),
            header: cfg.header.clone(),
            line: cfg.line,
            configured: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn value_path(&self) -> PathBuf {
        PathBuf::from(format!("{}/gpio{}/value", GPIO_ROOT, self.line))
    }

    ///Mux the header pin to gpio, export the line and set its direction to out.
    pub fn configure(&mut self) -> Result<(), RoverError> {
        pinmux::set_pin_mode(&self.header, "gpio");

        if self.export()? == ExportOutcome::AlreadyExported {
            warn!("gpio{} ({}) was already exported", self.line, self.name);
        }

        let direction = format!("{}/gpio{}/direction", GPIO_ROOT, self.line);
        fs::write(&direction, "out").map_err(|err| {
            RoverError::Config(format!(
                "error setting direction on gpio{} ({}): {}",
                self.line, self.name, err
            ))
        })?;

        self.configured = true;
        debug!("configured gpio{} ({}) as output", self.line, self.name);
        Ok(())
    }

    //write the line number to the export control.
    //ResourceBusy from the kernel means the line was already exported.
    fn export(&self) -> Result<ExportOutcome, RoverError> {
        match fs::write(format!("{}/export", GPIO_ROOT), self.line.to_string()) {
            Ok(()) => Ok(ExportOutcome::Exported),
            Err(err) if err.kind() == ErrorKind::ResourceBusy => Ok(ExportOutcome::AlreadyExported),
            Err(err) => Err(RoverError::Config(format!(
                "error exporting gpio{} ({}): {}",
                self.line, self.name, err
            ))),
        }
    }

    ///Write the level. Every call performs the sysfs write; nothing is cached.
    pub fn set_level(&self, high: bool) -> Result<(), RoverError> {
        if !self.configured {
            return Err(RoverError::Config(format!(
                "gpio{} ({}) used before configure",
                self.line, self.name
            )));
        }
        fs::write(self.value_path(), if high { "1" } else { "0" }).map_err(|err| {
            RoverError::Io(format!(
                "error writing gpio{} ({}): {}",
                self.line, self.name, err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{GpioLine, PinConfig};

    #[test]
    fn level_write_requires_configure() {
        let line = GpioLine::new(
            "STBY",
            &PinConfig {
                header: "P8_9".to_string(),
                line: 69,
            },
        );
        assert!(line.set_level(true).is_err());
    }
}
