//! Arrival detection and the alert pipeline
//!
//! Civilians submit incident and SOS records into the shared store from the
//! mobile app; this crate is the dashboard side that notices each new record
//! exactly once and turns it into the single visible alert, the repeating
//! siren, and a desktop notification.
//!
//! ```text
//! store notifications ──► ArrivalWatcher ──► AlertDispatcher ──► AlarmPlayer
//!                                                │
//!                                                └──► Notifier (desktop)
//! ```
//!
//! [`AlertMonitor`] wires the pieces to a [`SharedStore`] and owns all of
//! their state, so independent dashboard instances (and tests) never share
//! anything.
//!
//! [`SharedStore`]: eresponde_store_core::SharedStore

pub mod alarm;
pub mod alert;
pub mod dispatcher;
pub mod extract;
pub mod monitor;
pub mod notify;
pub mod watcher;

pub use alarm::AlarmPlayer;
pub use alert::{Alert, AlertDetail, AlertSource, Severity};
pub use dispatcher::{AlertDispatcher, PLACEHOLDER_REPORTER};
pub use monitor::AlertMonitor;
pub use notify::{Notifier, NullNotifier, TestNotifier};
pub use watcher::{Arrival, ArrivalWatcher};
