//! Launch sequence
//!
//! `[start] -> debug check -> [attach & wait] -> invoke entry point`
//!
//! A missing debug facility is reported and skipped. Anything else that goes
//! wrong while attaching aborts the launch. The entry point's own result is
//! passed through untouched.

use std::io::Write;

use thiserror::Error;

use crate::config::DebuggerConfig;
use crate::debug_mode::DebugMode;
use crate::debugger::{Attachment, DebugFacility, DebuggerError, FacilityLoader};
use crate::entry::EntryPoint;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("debugger attach failed: {0}")]
    Debugger(#[from] DebuggerError),

    #[error("failed to write diagnostics: {0}")]
    Output(#[from] std::io::Error),
}

/// Run the launch sequence
///
/// Diagnostic lines go to `out`. When debugging is enabled and the facility
/// loads, this blocks until a debugger attaches. The facility is kept alive
/// until the entry point returns.
pub fn launch<L, W, E>(
    mode: DebugMode,
    debugger: &DebuggerConfig,
    loader: &L,
    out: &mut W,
    entry: E,
) -> Result<E::Output, LaunchError>
where
    L: FacilityLoader + ?Sized,
    W: Write + ?Sized,
    E: EntryPoint,
{
    if !mode.enabled() {
        tracing::debug!("debugging disabled");
        return Ok(entry.invoke(None));
    }

    tracing::debug!(source = ?mode.source(), facility = %debugger.facility, "debugging requested");

    let (_facility, attachment) = match loader.load(debugger) {
        Ok(facility) => {
            let (facility, attachment) = attach(facility, out)?;
            (Some(facility), Some(attachment))
        }
        Err(DebuggerError::NotFound { name }) => {
            tracing::warn!(facility = %name, "debug facility unavailable, continuing without it");
            writeln!(out, "{name} library was not found")?;
            out.flush()?;
            (None, None)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(entry.invoke(attachment.as_ref()))
}

fn attach<W>(
    mut facility: Box<dyn DebugFacility>,
    out: &mut W,
) -> Result<(Box<dyn DebugFacility>, Attachment), LaunchError>
where
    W: Write + ?Sized,
{
    facility.enable_attach()?;
    writeln!(out, "{} is running", facility.name())?;
    // Must be visible before we block
    out.flush()?;

    let attachment = facility.wait_for_attach()?;
    tracing::info!(%attachment, "continuing to entry point");
    Ok((facility, attachment))
}
