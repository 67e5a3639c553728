//! Navigation side effect fired when a session cannot be recovered

use std::sync::Mutex;
use tracing::warn;

/// Receives the redirect issued after an irrecoverable authentication failure
pub trait Navigator: Send + Sync {
    /// Move the user to `path` (normally the login entry point)
    fn navigate(&self, path: &str);
}

/// Navigator for headless front ends: logs the redirect and remembers it
#[derive(Debug, Default)]
pub struct LogNavigator {
    last: Mutex<Option<String>>,
}

impl LogNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent redirect target, if any
    pub fn last_path(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        warn!(path, "Session ended, redirecting to login");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(path.to_string());
        }
    }
}
