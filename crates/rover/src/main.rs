pub mod config;
pub mod drive;
pub mod keys;
pub mod led;
pub mod session;

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use config::RoverConfig;
use rover_bbb_gpio::pwm::SysfsPwm;
use rover_core::error::RoverError;
use rover_devices::devices::pca9685::{Pca9685, PwmChannel};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::drive::Drive;
use crate::led::Led;
use crate::session::Session;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rover=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (cfg_name, mode) = match args.len() {
        2 => (args[1].as_str(), "drive"),
        3 => (args[1].as_str(), args[2].as_str()),
        _ => {
            warn!("expected a config file and an optional mode (drive|breathe)");
            warn!("got {}", args.join(","));
            return ExitCode::FAILURE;
        }
    };

    let config = match RoverConfig::load(cfg_name) {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load config: {:?}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("rover starting up!");
    if let Some(ref name) = config.metadata.name {
        info!("name: {name}")
    }
    if let Some(ref descrip) = config.metadata.description {
        info!("description: {descrip}")
    }

    //`q` and ctrl-c converge on the same cancellation and the same cleanup
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let result = match mode {
        "drive" => run_drive(&config, cancel).await,
        "breathe" => run_breathe(&config, cancel).await,
        other => Err(RoverError::Config(format!("unknown mode: {}", other))),
    };

    match result {
        Ok(()) => {
            info!("rover shut down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("rover exited with an error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}

///The interactive teleop session over the chip-backed drive and led channels.
async fn run_drive(config: &RoverConfig, cancel: CancellationToken) -> Result<(), RoverError> {
    let i2c = rover_bbb_gpio::open_bus(config.pwm_chip.bus)?;
    let mut chip = Pca9685::new(i2c, config.pwm_chip.address);
    chip.initialize(config.pwm_chip.frequency_hz)?;
    let chip = Arc::new(Mutex::new(chip));

    let speed_a = PwmChannel::new(chip.clone(), config.pwm_chip.drive_a)?;
    let speed_b = PwmChannel::new(chip.clone(), config.pwm_chip.drive_b)?;
    let led_channel = PwmChannel::new(chip.clone(), config.pwm_chip.led)?;

    let drive = Drive::try_build(&config.pins, speed_a, speed_b)?;
    let led = Led::new(led_channel);

    let (_raw_mode, mut key_rx) = keys::spawn_key_reader()?;

    let mut session = Session::new(drive, led, config.session.initial_speed);
    session.apply_initial_speed()?;

    let result = session.run(&mut key_rx, cancel).await;

    //the cleanup path is the same for `q`, interrupt and error exits:
    //stop the motors, then release the bus handle
    if let Err(err) = session.stop() {
        error!("failed to stop motors during shutdown: {:?}", err);
    }
    drop(session);
    drop(chip);

    result
}

///The breathing-led demo over the kernel pwm line.
async fn run_breathe(config: &RoverConfig, cancel: CancellationToken) -> Result<(), RoverError> {
    let led_cfg = config
        .led_pwm
        .as_ref()
        .ok_or_else(|| RoverError::Config("breathe mode requires a led_pwm section".to_string()))?;
    let pwm = SysfsPwm::new(led_cfg);
    led::run_breathe(&pwm, led_cfg, cancel).await
}
