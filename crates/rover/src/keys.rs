use std::io::Read;
use std::os::unix::io::AsRawFd;

use rover_core::error::RoverError;
use termios::{tcsetattr, Termios, ECHO, ICANON, TCSADRAIN, TCSANOW, VMIN, VTIME};
use tokio::sync::mpsc;
use tracing::{debug, error};

///Restores the original terminal attributes when dropped.
pub struct RawModeGuard {
    fd: i32,
    saved: Termios,
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = tcsetattr(self.fd, TCSADRAIN, &self.saved) {
            error!("failed to restore terminal attributes: {}", err);
        }
    }
}

///Put stdin into single-byte unechoed mode and spawn a blocking reader thread that
///feeds one byte per keystroke into the returned channel. ISIG stays set, so ctrl-c
///still raises SIGINT while the reader blocks.
pub fn spawn_key_reader() -> Result<(RawModeGuard, mpsc::Receiver<u8>), RoverError> {
    let fd = std::io::stdin().as_raw_fd();
    let saved = Termios::from_fd(fd)
        .map_err(|err| RoverError::Config(format!("stdin is not a terminal: {}", err)))?;

    let mut raw = saved;
    raw.c_lflag &= !(ICANON | ECHO);
    raw.c_cc[VMIN] = 1;
    raw.c_cc[VTIME] = 0;
    tcsetattr(fd, TCSANOW, &raw)
        .map_err(|err| RoverError::Config(format!("failed to set raw mode: {}", err)))?;

    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 1];
        loop {
            match stdin.read(&mut buf) {
                Ok(1) => {
                    if tx.blocking_send(buf[0]).is_err() {
                        break;
                    }
                }
                Ok(_) => break,
                Err(err) => {
                    error!("error reading stdin: {}", err);
                    break;
                }
            }
        }
        debug!("key reader shutting down");
    });

    Ok((RawModeGuard { fd, saved }, rx))
}
