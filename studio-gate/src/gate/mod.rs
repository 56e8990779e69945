//! Access gate — which single view a visitor sees
//!
//! [`resolve_view`] is the pure decision; [`GateActor`] wraps it with the
//! session lifecycle, the concurrent access-flag fetch, and user actions.

pub mod actor;
pub mod resolve;
pub mod types;

pub use actor::{GateActor, GateHandle};
pub use resolve::{resolve_view, GateInputs};
pub use types::{AccessFlags, GateSnapshot, Identity, Session, UserRole, ViewState};
