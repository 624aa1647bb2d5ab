//! Test harness for the launcher
//!
//! Drives the launch sequence without real debuggers or child processes.
//!
//! # Modules
//!
//! - `fixtures`: Fake facilities, loaders and entry points that record what happened
//! - `assertions`: Common test assertions over recorded events and output

pub mod assertions;
pub mod fixtures;

pub use fixtures::{Event, EventLog, FakeFacility, FakeLoader, RecordingEntry};
