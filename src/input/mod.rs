//! Pointer input: event source, click log and the click handler.

mod click_log;
mod handler;
mod observer;
mod rdev_backend;

pub use click_log::ClickLog;
pub use handler::{click_worker, ClickHandler, ClickOutcome};
pub use observer::{ClickObserver, ConsoleObserver};
pub use rdev_backend::RdevInputSource;

use chrono::{DateTime, Utc};

use crate::models::MouseButton;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Press,
    Release,
}

/// A button notification in global desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub action: PointerAction,
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
    pub at: DateTime<Utc>,
}

impl InputEvent {
    pub fn press(x: i32, y: i32, button: MouseButton) -> Self {
        Self {
            action: PointerAction::Press,
            x,
            y,
            button,
            at: Utc::now(),
        }
    }

    pub fn release(x: i32, y: i32, button: MouseButton) -> Self {
        Self {
            action: PointerAction::Release,
            ..Self::press(x, y, button)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input source already has a subscriber")]
    AlreadySubscribed,

    #[error("Failed to start input listener: {0}")]
    ListenerFailed(String),
}

pub type InputCallback = Box<dyn Fn(InputEvent) + Send + Sync + 'static>;

/// Delivers press/release notifications to a single subscriber.
pub trait InputSource: Send + Sync {
    fn subscribe(&self, callback: InputCallback) -> Result<(), InputError>;

    /// Once this returns, the old callback is never invoked again.
    fn unsubscribe(&self);
}
