use std::sync::Mutex;

use crate::models::ClickEvent;

/// Ordered, append-only record of press events for one run.
#[derive(Debug, Default)]
pub struct ClickLog {
    entries: Mutex<Vec<ClickEvent>>,
}

impl ClickLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: ClickEvent) -> usize {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(event);
        entries.len()
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<ClickEvent> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
