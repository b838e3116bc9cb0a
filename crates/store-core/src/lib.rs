//! Shared-store layer for the E-Responde operations dashboard
//!
//! The hosted realtime database is an external collaborator: the dashboard
//! only ever reads it, writes to it, and subscribes to it. This crate pins
//! that contract down as the [`SharedStore`] trait, ships a deterministic
//! in-memory implementation ([`MemoryStore`]) that defines the reference
//! semantics and backs every test in the workspace, and declares the
//! wire-compatible record types exchanged with the mobile client.
//!
//! # Store layout
//!
//! ```text
//! civilian/civilian crime reports/{reportId}   incident records
//! civilian/civilian account/{uid}              reporter accounts
//! sos_alerts/{alertId}                         SOS records
//! voip_calls/{callId}                          call records
//! signaling/{callId}/offer                     caller session description
//! signaling/{callId}/answer                    callee session description
//! signaling/{callId}/iceCandidates/caller      streamed ICE candidates
//! signaling/{callId}/iceCandidates/callee      streamed ICE candidates
//! ```
//!
//! The path strings and the serialized field names in [`records`] are shared
//! with the deployed mobile client and must not change.

pub mod error;
pub mod logging;
pub mod memory;
pub mod path;
pub mod records;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use path::StorePath;
pub use records::{
    now_iso8601, CallRecord, CallStatus, CivilianAccount, IceCandidateInit, IncidentRecord,
    Participant, SessionDescription, SosRecord,
};
pub use store::{ChildEvent, ChildSubscription, SharedStore, SubscriptionGuard, ValueSubscription};
