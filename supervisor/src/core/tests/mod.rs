//! Core supervision tests
//!
//! Lifecycle tests run real `sh` workers with short timings.
