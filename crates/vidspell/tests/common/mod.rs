//! Shared test utilities for vidspell integration tests.
//!
//! This module provides:
//! - Scripted fake collaborators standing in for ffmpeg, the vision service
//!   and the speech-to-text engine
//! - `TestHarness` wiring them into an `Orchestrator` with short timeouts

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::{test_config, TestHarness};
