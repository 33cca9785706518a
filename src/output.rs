use std::sync::Mutex;

/// Progress reporting for a backup run, shared by the CLI and library callers
///
/// The script itself may go to stdout, so handlers that print use stderr.
pub trait OutputHandler: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn info(&self, message: &str);

    fn warning(&self, message: &str);

    /// Start of a backup phase
    fn heading(&self, message: &str);

    /// Per-table progress, e.g. `status("Creating", "customers")`
    fn status(&self, action: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Success,
    Error,
    Info,
    Warning,
    Heading,
    Status,
}

/// Keeps every message in memory for later inspection
#[derive(Debug, Default)]
pub struct CollectingOutputHandler {
    messages: Mutex<Vec<(OutputLevel, String)>>,
}

impl CollectingOutputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(OutputLevel, String)> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages of one level, in arrival order
    pub fn messages_at(&self, level: OutputLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    fn push(&self, level: OutputLevel, message: String) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message));
    }
}

impl OutputHandler for CollectingOutputHandler {
    fn success(&self, message: &str) {
        self.push(OutputLevel::Success, message.to_string());
    }

    fn error(&self, message: &str) {
        self.push(OutputLevel::Error, message.to_string());
    }

    fn info(&self, message: &str) {
        self.push(OutputLevel::Info, message.to_string());
    }

    fn warning(&self, message: &str) {
        self.push(OutputLevel::Warning, message.to_string());
    }

    fn heading(&self, message: &str) {
        self.push(OutputLevel::Heading, message.to_string());
    }

    fn status(&self, action: &str, message: &str) {
        self.push(OutputLevel::Status, format!("{} {}", action, message));
    }
}

/// Colored progress on stderr
#[cfg(feature = "cli")]
pub struct CliOutputHandler;

#[cfg(feature = "cli")]
impl OutputHandler for CliOutputHandler {
    fn success(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{} {}", "✓".green(), message);
    }

    fn error(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{} {}", "✗".red(), message);
    }

    fn info(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn warning(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    fn heading(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("\n{}", message.bold());
    }

    fn status(&self, action: &str, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{:>12} {}", action.green().bold(), message);
    }
}

/// Discards everything
pub struct SilentOutputHandler;

impl OutputHandler for SilentOutputHandler {
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn heading(&self, _message: &str) {}
    fn status(&self, _action: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_handler_keeps_order() {
        let handler = CollectingOutputHandler::new();

        handler.heading("Table definitions");
        handler.status("Creating", "customers");
        handler.warning("Skipping table orders;drop");
        handler.status("Creating", "orders");
        handler.success("Backup written");

        let messages = handler.messages();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], (OutputLevel::Heading, "Table definitions".to_string()));
        assert_eq!(messages[1], (OutputLevel::Status, "Creating customers".to_string()));
        assert_eq!(
            handler.messages_at(OutputLevel::Status),
            vec!["Creating customers", "Creating orders"]
        );
        assert_eq!(
            handler.messages_at(OutputLevel::Warning),
            vec!["Skipping table orders;drop"]
        );
    }

    #[test]
    fn test_collecting_handler_is_shareable_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let handler = Arc::new(CollectingOutputHandler::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let handler = Arc::clone(&handler);
                thread::spawn(move || handler.info(&format!("table_{}", i)))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(handler.messages_at(OutputLevel::Info).len(), 8);
    }

    #[test]
    fn test_silent_handler_accepts_everything() {
        let handler = SilentOutputHandler;
        handler.heading("Table data");
        handler.status("Dumped", "customers (2 rows)");
        handler.error("nothing to see");
    }
}
