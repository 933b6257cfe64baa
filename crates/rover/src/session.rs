use rover_core::duty;
use rover_core::error::RoverError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::drive::{Drive, Maneuver};
use crate::led::{self, Led};

//per-keystroke speed increment in duty ticks
const SPEED_STEP: i64 = 200;

///What a keystroke asks the hardware to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Maneuver(Maneuver),
    Speed(u16),
    Led(u16),
    Quit,
    Ignore,
}

///Mutable session state: the current drive duty and led duty.
///The led duty starts at 0, so the multiplicative steps do nothing until the
///led is first switched on.
#[derive(Debug)]
pub struct SessionState {
    speed: u16,
    led_duty: u16,
}

impl SessionState {
    pub fn new(initial_speed: u16) -> SessionState {
        SessionState {
            speed: duty::clamp(initial_speed as i64),
            led_duty: 0,
        }
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    pub fn led_duty(&self) -> u16 {
        self.led_duty
    }

    ///Advance the state machine by one keystroke. Unknown keys are ignored, not errors.
    pub fn apply_key(&mut self, key: u8) -> Action {
        match key {
            b'w' => Action::Maneuver(Maneuver::Forward),
            b's' => Action::Maneuver(Maneuver::Reverse),
            b'a' => Action::Maneuver(Maneuver::Left),
            b'd' => Action::Maneuver(Maneuver::Right),
            b'x' => Action::Maneuver(Maneuver::Stop),
            b'+' => {
                self.speed = duty::clamp(self.speed as i64 + SPEED_STEP);
                Action::Speed(self.speed)
            }
            b'-' => {
                self.speed = duty::clamp(self.speed as i64 - SPEED_STEP);
                Action::Speed(self.speed)
            }
            b'i' => {
                self.led_duty = duty::DUTY_MAX;
                Action::Led(self.led_duty)
            }
            b'o' => {
                self.led_duty = 0;
                Action::Led(self.led_duty)
            }
            b'k' => {
                self.led_duty = led::step_up(self.led_duty);
                Action::Led(self.led_duty)
            }
            b'l' => {
                self.led_duty = led::step_down(self.led_duty);
                Action::Led(self.led_duty)
            }
            b'q' => Action::Quit,
            _ => Action::Ignore,
        }
    }
}

///The interactive loop: one keystroke in, one hardware action out.
pub struct Session {
    state: SessionState,
    drive: Drive,
    led: Led,
}

impl Session {
    pub fn new(drive: Drive, led: Led, initial_speed: u16) -> Session {
        Session {
            state: SessionState::new(initial_speed),
            drive,
            led,
        }
    }

    ///Push the starting speed to both drive channels before the first keystroke.
    pub fn apply_initial_speed(&mut self) -> Result<(), RoverError> {
        self.drive.set_speed(self.state.speed())?;
        info!("speed (0..=4095): {}", self.state.speed());
        Ok(())
    }

    ///Apply the stop maneuver. Part of the shutdown path shared by every exit.
    pub fn stop(&mut self) -> Result<(), RoverError> {
        self.drive.apply(Maneuver::Stop)
    }

    ///Run until `q`, cancellation, or an I/O failure. The caller owns the cleanup
    ///that follows, whichever way this returns.
    pub async fn run(
        &mut self,
        keys: &mut mpsc::Receiver<u8>,
        cancel: CancellationToken,
    ) -> Result<(), RoverError> {
        info!("commands: w=forward s=reverse a=left d=right x=stop");
        info!("          +/-=speed, i/o=led on/off, k/l=led brighter/dimmer, q=quit");
        loop {
            let key = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("interrupted");
                    return Ok(());
                }
                key = keys.recv() => match key {
                    Some(key) => key,
                    //stdin is gone; treat it like an exit request
                    None => return Ok(()),
                },
            };
            match self.state.apply_key(key) {
                Action::Maneuver(maneuver) => {
                    debug!("{:?} -> {:?}", self.drive.maneuver(), maneuver);
                    self.drive.apply(maneuver)?;
                    info!("{:?}", maneuver);
                }
                Action::Speed(duty) => {
                    self.drive.set_speed(duty)?;
                    info!("speed: {}", duty);
                }
                Action::Led(duty) => {
                    self.led.set_duty(duty)?;
                    info!("led: {}", self.state.led_duty());
                }
                Action::Quit => {
                    info!("quitting");
                    return Ok(());
                }
                Action::Ignore => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, SessionState};
    use crate::drive::Maneuver;

    #[test]
    fn drive_keystroke_scenario() {
        let mut state = SessionState::new(2800);
        assert_eq!(state.apply_key(b'w'), Action::Maneuver(Maneuver::Forward));
        assert_eq!(state.apply_key(b'+'), Action::Speed(3000));
        assert_eq!(state.apply_key(b'+'), Action::Speed(3200));
        assert_eq!(state.speed(), 3200);
        assert_eq!(state.apply_key(b'q'), Action::Quit);
    }

    #[test]
    fn speed_saturates_at_both_bounds() {
        let mut state = SessionState::new(4095);
        assert_eq!(state.apply_key(b'+'), Action::Speed(4095));

        let mut state = SessionState::new(0);
        assert_eq!(state.apply_key(b'-'), Action::Speed(0));
    }

    #[test]
    fn led_keys_track_the_duty() {
        let mut state = SessionState::new(2800);
        //starts dark; a multiplicative step on 0 stays 0
        assert_eq!(state.apply_key(b'k'), Action::Led(0));
        assert_eq!(state.apply_key(b'i'), Action::Led(4095));
        assert_eq!(state.apply_key(b'l'), Action::Led(3276));
        assert_eq!(state.apply_key(b'o'), Action::Led(0));
        assert_eq!(state.led_duty(), 0);
    }

    #[test]
    fn stop_does_not_quit() {
        let mut state = SessionState::new(2800);
        assert_eq!(state.apply_key(b'x'), Action::Maneuver(Maneuver::Stop));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut state = SessionState::new(2800);
        assert_eq!(state.apply_key(b'z'), Action::Ignore);
        assert_eq!(state.apply_key(0x1B), Action::Ignore);
        assert_eq!(state.speed(), 2800);
        assert_eq!(state.led_duty(), 0);
    }

    #[test]
    fn initial_speed_clamps() {
        let state = SessionState::new(5000);
        assert_eq!(state.speed(), 4095);
    }
}
