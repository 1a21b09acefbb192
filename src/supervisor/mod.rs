mod controller;
mod state;

pub use controller::{Collaborators, Supervisor, SHUTDOWN_TIMEOUT};
pub use state::{StatusReport, SupervisorStatus};
