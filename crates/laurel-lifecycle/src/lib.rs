//! The achievement lifecycle: state transitions driven across two stores
//! that share no transaction.
//!
//! [`Coordinator`] is the entry point. It evaluates guards in a fixed order
//! (permission, existence, relationship, state, payload) and only then
//! writes, document store first and reference store last, so the reference
//! status is always the last-committed fact.

pub mod authz;
pub mod coordinator;
pub mod deadline;
pub mod fence;
pub mod ownership;

pub use authz::AuthorizationResolver;
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use deadline::Deadline;
pub use ownership::OwnershipResolver;
