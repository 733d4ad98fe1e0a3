//! Test doubles for the metersync collaborators.
//!
//! - [`DynamicMockConnector`]: fully scripted through a [`DynamicMockController`].
//! - [`FixtureConnector`]: serves a deterministic hourly profile and models
//!   token expiry.
//! - [`MemorySessionStore`]: in-memory persistence with failure injection.

mod dynamic;
mod fixture;
mod fixtures;
mod store;

pub use dynamic::{DynamicMockConnector, DynamicMockController, MockBehavior};
pub use fixture::FixtureConnector;
pub use store::MemorySessionStore;
