use crate::models::ClickEvent;

/// Receives the outcome of every processed click for immediate feedback.
pub trait ClickObserver: Send + Sync {
    fn on_click(&self, click: &ClickEvent, text: &str);
}

/// Prints a banner per click on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl ClickObserver for ConsoleObserver {
    fn on_click(&self, click: &ClickEvent, text: &str) {
        println!("\n=== CLICK DETECTED ===");
        println!("Position: ({}, {})", click.x, click.y);
        if text.is_empty() {
            println!("No text detected in the region");
        } else {
            let rule = "-".repeat(40);
            println!("Extracted Text around cursor:");
            println!("{rule}");
            println!("{text}");
            println!("{rule}");
        }
    }
}
