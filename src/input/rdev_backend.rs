//! Global pointer events via the `rdev` crate.
//!
//! `rdev::listen` blocks its thread for the life of the process and has no
//! way to stop, so the listener thread is started once and subscription is a
//! slot it checks on every event.

use std::sync::{Arc, Mutex};
use std::thread;

use rdev::{Button, EventType};

use super::{InputCallback, InputError, InputEvent, InputSource};
use crate::models::MouseButton;

type Slot = Arc<Mutex<Option<InputCallback>>>;

#[derive(Default)]
pub struct RdevInputSource {
    slot: Slot,
    listener: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RdevInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_listener(&self) -> Result<(), InputError> {
        let mut listener = match self.listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if listener.is_some() {
            return Ok(());
        }

        let slot = Arc::clone(&self.slot);
        let handle = thread::Builder::new()
            .name("screenshot-ocr-input".into())
            .spawn(move || {
                // Button events carry no position; track the last move.
                let mut position = (0.0_f64, 0.0_f64);
                let result = rdev::listen(move |event| {
                    let action = match event.event_type {
                        EventType::MouseMove { x, y } => {
                            position = (x, y);
                            return;
                        }
                        EventType::ButtonPress(button) => (true, button),
                        EventType::ButtonRelease(button) => (false, button),
                        _ => return,
                    };

                    let (x, y) = (position.0.round() as i32, position.1.round() as i32);
                    let button = map_button(action.1);
                    let input = if action.0 {
                        InputEvent::press(x, y, button)
                    } else {
                        InputEvent::release(x, y, button)
                    };

                    let guard = match slot.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    if let Some(callback) = guard.as_ref() {
                        callback(input);
                    }
                });

                if let Err(err) = result {
                    log::error!("Input listener stopped: {err:?}");
                }
            })
            .map_err(|e| InputError::ListenerFailed(e.to_string()))?;

        *listener = Some(handle);
        Ok(())
    }
}

fn map_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Right => MouseButton::Right,
        Button::Middle => MouseButton::Middle,
        Button::Unknown(code) => MouseButton::Other(code),
    }
}

impl InputSource for RdevInputSource {
    fn subscribe(&self, callback: InputCallback) -> Result<(), InputError> {
        {
            let mut slot = match self.slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if slot.is_some() {
                return Err(InputError::AlreadySubscribed);
            }
            *slot = Some(callback);
        }

        if let Err(err) = self.ensure_listener() {
            self.unsubscribe();
            return Err(err);
        }
        log::info!("Pointer listener subscribed");
        Ok(())
    }

    fn unsubscribe(&self) {
        // Delivery holds the same lock, so nothing is in flight once we have it.
        let previous = {
            let mut slot = match self.slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        if previous.is_some() {
            log::info!("Pointer listener unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rdev_buttons() {
        assert_eq!(map_button(Button::Left), MouseButton::Left);
        assert_eq!(map_button(Button::Right), MouseButton::Right);
        assert_eq!(map_button(Button::Middle), MouseButton::Middle);
        assert_eq!(map_button(Button::Unknown(8)), MouseButton::Other(8));
    }
}
