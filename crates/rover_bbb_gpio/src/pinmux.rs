use std::process::{Command, Stdio};

use tracing::debug;

const CONFIG_PIN: &str = "/usr/bin/config-pin";

///Place a multiplexed header pin into the given mode via the board's `config-pin` utility.
///Output is discarded and failure is not distinguished from success.
pub fn set_pin_mode(header: &str, mode: &str) {
    debug!("config-pin {} {}", header, mode);
    let _ = Command::new(CONFIG_PIN)
        .arg(header)
        .arg(mode)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
