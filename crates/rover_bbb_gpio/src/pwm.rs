use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use rover_core::error::RoverError;
use serde::Deserialize;
use tracing::debug;

const EXPORT_ATTEMPTS: u32 = 50;
const EXPORT_POLL: Duration = Duration::from_millis(10);

fn default_chip() -> String {
    "/sys/class/pwm/pwmchip0".to_string()
}

fn default_step() -> f64 {
    0.05
}

fn default_tick_ms() -> u64 {
    100
}

///Configuration for one kernel pwm channel used as an LED dimmer.
#[derive(Debug, Deserialize, Clone)]
pub struct SysfsPwmConfig {
    #[serde(default = "default_chip")]
    pub chip: String,
    pub channel: u32,
    pub frequency_hz: u64,
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

///Result of a disable request.
#[derive(Debug, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled,
    AlreadyGone,
}

///One kernel-exposed pwm line, addressed as `<chip>/pwm<N>`.
pub struct SysfsPwm {
    chip: PathBuf,
    channel: u32,
}

//period in nanoseconds for the frequency, and a duty strictly below it for the ratio.
//the duty never reaches the period; full-on belongs to the chip-backed path.
fn timings(frequency_hz: u64, ratio: f64) -> (u64, u64) {
    let period_ns = 1_000_000_000 / frequency_hz;
    let duty_ns = (period_ns as f64 * ratio.clamp(0.0, 1.0)) as u64;
    (period_ns, duty_ns.min(period_ns - 1))
}

fn checked_timings(frequency_hz: u64, ratio: f64) -> Result<(u64, u64), RoverError> {
    if frequency_hz == 0 || frequency_hz > 1_000_000_000 {
        return Err(RoverError::Config(format!(
            "pwm frequency out of range: {}Hz",
            frequency_hz
        )));
    }
    Ok(timings(frequency_hz, ratio))
}

impl SysfsPwm {
    pub fn new(cfg: &SysfsPwmConfig) -> SysfsPwm {
        SysfsPwm {
            chip: PathBuf::from(&cfg.chip),
            channel: cfg.channel,
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    fn node(&self) -> PathBuf {
        self.chip.join(format!("pwm{}", self.channel))
    }

    ///Export the channel if its node is absent, then configure and switch it on.
    ///The kernel interface wants disable, period, duty_cycle, enable in exactly that order.
    pub fn enable(&self, frequency_hz: u64, ratio: f64) -> Result<(u64, u64), RoverError> {
        let (period_ns, duty_ns) = checked_timings(frequency_hz, ratio)?;
        let node = self.node();

        if !node.is_dir() {
            fs::write(self.chip.join("export"), self.channel.to_string()).map_err(|err| {
                RoverError::Config(format!("error exporting {}: {}", node.display(), err))
            })?;
            self.wait_for_node(&node)?;
        }

        self.disable()?;
        self.write_attr(&node, "period", period_ns)?;
        self.write_attr(&node, "duty_cycle", duty_ns)?;
        self.write_attr(&node, "enable", 1)?;
        debug!(
            "pwm{} on: period {}ns, duty {}ns",
            self.channel, period_ns, duty_ns
        );
        Ok((period_ns, duty_ns))
    }

    ///Rewrite only the duty value at the already-configured period.
    pub fn update_duty(&self, frequency_hz: u64, ratio: f64) -> Result<u64, RoverError> {
        let (_, duty_ns) = checked_timings(frequency_hz, ratio)?;
        self.write_attr(&self.node(), "duty_cycle", duty_ns)?;
        Ok(duty_ns)
    }

    ///Switch the channel off. A missing channel node counts as already disabled.
    pub fn disable(&self) -> Result<DisableOutcome, RoverError> {
        match fs::write(self.node().join("enable"), "0") {
            Ok(()) => Ok(DisableOutcome::Disabled),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(DisableOutcome::AlreadyGone),
            Err(err) => Err(RoverError::Io(format!(
                "error disabling {}: {}",
                self.node().display(),
                err
            ))),
        }
    }

    fn wait_for_node(&self, node: &Path) -> Result<(), RoverError> {
        for _ in 0..EXPORT_ATTEMPTS {
            if node.is_dir() {
                return Ok(());
            }
            sleep(EXPORT_POLL);
        }
        Err(RoverError::Timeout(format!(
            "{} did not appear after export",
            node.display()
        )))
    }

    fn write_attr(&self, node: &Path, attr: &str, value: u64) -> Result<(), RoverError> {
        fs::write(node.join(attr), value.to_string()).map_err(|err| {
            RoverError::Io(format!(
                "error writing {}/{}: {}",
                node.display(),
                attr,
                err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{timings, DisableOutcome, SysfsPwm, SysfsPwmConfig};

    fn config(chip: &str, channel: u32) -> SysfsPwmConfig {
        SysfsPwmConfig {
            chip: chip.to_string(),
            channel,
            frequency_hz: 200,
            step: 0.05,
            tick_ms: 100,
        }
    }

    #[test]
    fn duty_stays_strictly_below_period() {
        let (period_ns, duty_ns) = timings(200, 1.0);
        assert_eq!(period_ns, 5_000_000);
        assert_eq!(duty_ns, period_ns - 1);

        let (_, duty_ns) = timings(200, 0.5);
        assert_eq!(duty_ns, 2_500_000);

        let (_, duty_ns) = timings(200, 0.0);
        assert_eq!(duty_ns, 0);
    }

    #[test]
    fn timings_truncate_toward_zero() {
        let (period_ns, duty_ns) = timings(3, 0.1);
        assert_eq!(period_ns, 333_333_333);
        assert_eq!(duty_ns, 33_333_333);
    }

    #[test]
    fn out_of_range_ratios_clamp() {
        let (_, duty_ns) = timings(200, 1.5);
        assert_eq!(duty_ns, 4_999_999);
        let (_, duty_ns) = timings(200, -0.5);
        assert_eq!(duty_ns, 0);
    }

    #[test]
    fn enable_writes_the_full_sequence() {
        let dir = std::env::temp_dir().join(format!("rover-pwm-test-{}", std::process::id()));
        let node = dir.join("pwm0");
        fs::create_dir_all(&node).unwrap();

        let pwm = SysfsPwm::new(&config(&dir.display().to_string(), 0));
        pwm.enable(200, 0.5).unwrap();
        assert_eq!(fs::read_to_string(node.join("period")).unwrap(), "5000000");
        assert_eq!(
            fs::read_to_string(node.join("duty_cycle")).unwrap(),
            "2500000"
        );
        assert_eq!(fs::read_to_string(node.join("enable")).unwrap(), "1");

        let duty_ns = pwm.update_duty(200, 0.25).unwrap();
        assert_eq!(duty_ns, 1_250_000);
        assert_eq!(
            fs::read_to_string(node.join("duty_cycle")).unwrap(),
            "1250000"
        );

        assert_eq!(pwm.disable().unwrap(), DisableOutcome::Disabled);
        assert_eq!(fs::read_to_string(node.join("enable")).unwrap(), "0");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn disable_tolerates_a_missing_node() {
        let pwm = SysfsPwm::new(&config("/definitely/not/a/pwmchip", 3));
        assert_eq!(pwm.disable().unwrap(), DisableOutcome::AlreadyGone);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let pwm = SysfsPwm::new(&config("/definitely/not/a/pwmchip", 0));
        assert!(pwm.update_duty(0, 0.5).is_err());
    }
}
