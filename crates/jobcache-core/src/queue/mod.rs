//! Durable queue of mutating requests captured while offline.
//!
//! When a job application, profile update or job search cannot reach the
//! network, the worker records it here as a `PendingAction`. A background
//! sync trigger for that action's kind replays the queue oldest-first and
//! removes each action only once the server has accepted it.

pub mod action;
pub mod store;

pub use action::{ActionKind, InvalidPayload, PendingAction};
pub use store::ActionQueue;
