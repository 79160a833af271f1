//! Console implementation of the operator-notification sink.

use console::style;
use dialoguer::Confirm;
use grblconf::Notifier;
use log::debug;

/// Notifier that renders to the terminal and blocks until acknowledged.
///
/// The orchestrator treats notification as modal: it does not start the
/// next cycle until the operator confirms. In non-interactive mode the
/// message is still printed but no confirmation is awaited.
pub struct ConsoleNotifier {
    non_interactive: bool,
}

impl ConsoleNotifier {
    /// Create a notifier; `non_interactive` disables the acknowledgement
    /// prompt.
    pub fn new(non_interactive: bool) -> Self {
        Self { non_interactive }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, title: &str, message: &str, image_hint: Option<&str>) {
        eprintln!();
        eprintln!("{}", style(title).red().bold());
        eprintln!("{message}");
        if let Some(image) = image_hint {
            eprintln!("{}", style(format!("(see illustration: {image})")).dim());
        }

        if self.non_interactive {
            debug!("non-interactive mode, skipping acknowledgement prompt");
            return;
        }

        // Block until the operator acknowledges, like a modal dialog.
        let _ = Confirm::new()
            .with_prompt("Acknowledge and continue?")
            .default(true)
            .interact();
    }
}
