//! Attachable debug facilities
//!
//! A facility lets a debugger attach to the launcher before the entry point
//! starts. Facilities are optional: when the requested one cannot be found
//! the launcher reports it and carries on without debugging.

mod dap;
mod ptrace;

use std::fmt;

use thiserror::Error;

use crate::config::DebuggerConfig;

pub use dap::{DapListener, ADAPTER_FD_ENV_VAR, ADAPTER_PEER_ENV_VAR};
pub use ptrace::{parse_tracer_pid, PtraceFacility, TRACER_PID_ENV_VAR};

#[derive(Error, Debug)]
pub enum DebuggerError {
    #[error("debug facility not found: {name}")]
    NotFound { name: String },

    #[error("failed to listen for debugger on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to accept debugger connection: {0}")]
    Accept(std::io::Error),

    #[error("attach requested before enable_attach")]
    NotEnabled,

    #[error("failed to hand off debugger connection: {0}")]
    Handoff(std::io::Error),

    #[error("failed to read tracer status: {0}")]
    Procfs(std::io::Error),
}

/// What a facility learned when a debugger attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Facility that accepted the debugger
    pub facility: String,

    /// Who attached (socket address or tracer pid)
    pub peer: String,

    /// Variables exported to the entry point
    pub env: Vec<(String, String)>,
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attached from {}", self.facility, self.peer)
    }
}

/// A hook a debugger can attach through
pub trait DebugFacility {
    /// Name used in diagnostics ("<name> is running")
    fn name(&self) -> &str;

    /// Start accepting a debugger. Must not block.
    fn enable_attach(&mut self) -> Result<(), DebuggerError>;

    /// Block until a debugger attaches. There is no timeout.
    fn wait_for_attach(&mut self) -> Result<Attachment, DebuggerError>;
}

/// Locates a debug facility
pub trait FacilityLoader {
    /// Load the configured facility, or `DebuggerError::NotFound` when unavailable
    fn load(&self, config: &DebuggerConfig) -> Result<Box<dyn DebugFacility>, DebuggerError>;
}

impl<F> FacilityLoader for F
where
    F: Fn(&DebuggerConfig) -> Result<Box<dyn DebugFacility>, DebuggerError>,
{
    fn load(&self, config: &DebuggerConfig) -> Result<Box<dyn DebugFacility>, DebuggerError> {
        self(config)
    }
}

/// Built-in facilities, looked up by name
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry;

impl Registry {
    /// Facility names this build knows about
    pub const NAMES: [&'static str; 2] = [dap::NAME, ptrace::NAME];
}

impl FacilityLoader for Registry {
    fn load(&self, config: &DebuggerConfig) -> Result<Box<dyn DebugFacility>, DebuggerError> {
        let name = config.facility.trim();
        tracing::debug!(facility = name, "loading debug facility");

        match name {
            dap::NAME => Ok(Box::new(DapListener::new(config.address()))),
            ptrace::NAME => {
                let facility = PtraceFacility::probe(std::time::Duration::from_millis(
                    config.poll_interval_ms,
                ))?;
                Ok(Box::new(facility))
            }
            other => Err(DebuggerError::NotFound {
                name: other.to_string(),
            }),
        }
    }
}
