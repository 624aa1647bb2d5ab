//! Launcher - debugger-aware bootstrap for the catalyst agent
//!
//! Decides whether debugging was requested, optionally waits for a debugger
//! to attach, and then hands control to the application entry point.
//!
//! # Modules
//!
//! - `debug_mode`: Resolves whether debugging was requested (env + argv)
//! - `config`: Launcher configuration file and environment overrides
//! - `debugger`: Attachable debug facilities (DAP listener, ptrace)
//! - `entry`: The application entry point the launcher hands control to
//! - `launch`: The launch sequence tying the above together

pub mod config;
pub mod debug_mode;
pub mod debugger;
pub mod entry;
pub mod launch;

#[cfg(test)]
mod config_test;

pub use config::Config;
pub use debug_mode::{DebugMode, DebugSource, DEBUG_ENV_VAR, DEBUG_FLAG};
pub use debugger::{Attachment, DebugFacility, DebuggerError, FacilityLoader, Registry};
pub use entry::{CommandEntry, EntryError, EntryPoint};
pub use launch::{launch, LaunchError};
