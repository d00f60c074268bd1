use crate::config::LogConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Info,
    Warning,
}

impl Priority {
    fn as_str(self) -> &'static str {
        match self {
            Priority::Info => "info",
            Priority::Warning => "warning",
        }
    }
}

/// Argument list passed to `logger` for one event.
fn logger_args(priority: Priority, message: &str) -> Vec<String> {
    vec![
        "-t".to_string(),
        "bpm".to_string(),
        "-p".to_string(),
        format!("user.{}", priority.as_str()),
        message.to_string(),
    ]
}

/// Record an event in the system log via `logger`. Failures are ignored.
pub fn log(config: &LogConfig, priority: Priority, message: &str) {
    if !config.syslog {
        return;
    }
    let _ = std::process::Command::new("logger")
        .args(logger_args(priority, message))
        .status();
}
