//! Shared test utilities for backend-common.
//!
//! This crate provides:
//! - Proptest generators for addresses, ports and status codes
//! - Capturing log and statsd sinks
//! - Test fixtures with sample session data

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{LogCapture, RecordingSink};
