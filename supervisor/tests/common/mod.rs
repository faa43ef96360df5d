//! Common test utilities for supervisor integration tests

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::TestHelpers;
