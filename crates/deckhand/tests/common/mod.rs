//! Shared test utilities for deckhand integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories
//! - Fixture builders and scripted collaborators

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
