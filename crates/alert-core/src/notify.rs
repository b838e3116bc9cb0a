//! Host desktop-notification seam

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The host platform's notification surface
///
/// The dispatcher shows a desktop notification only while the dashboard
/// window is unfocused; a focused dispatcher already has the alert overlay
/// in front of them.
pub trait Notifier: Send + Sync {
    /// Whether the dashboard window currently has focus
    fn has_focus(&self) -> bool;

    /// Display a system notification
    fn display(&self, title: &str, body: &str);
}

/// Notifier for headless deployments: always "focused", displays nothing
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn has_focus(&self) -> bool {
        true
    }

    fn display(&self, _title: &str, _body: &str) {}
}

/// Recording notifier for tests
#[derive(Debug, Default)]
pub struct TestNotifier {
    focused: AtomicBool,
    displayed: Mutex<Vec<(String, String)>>,
}

impl TestNotifier {
    /// Create an unfocused test notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the window gaining or losing focus
    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    /// Notifications displayed so far, as `(title, body)`
    pub fn displayed(&self) -> Vec<(String, String)> {
        self.displayed.lock().clone()
    }
}

impl Notifier for TestNotifier {
    fn has_focus(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn display(&self, title: &str, body: &str) {
        self.displayed
            .lock()
            .push((title.to_string(), body.to_string()));
    }
}
