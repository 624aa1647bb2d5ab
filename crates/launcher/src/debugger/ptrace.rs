//! Native debugger attach via ptrace
//!
//! Waits for gdb, lldb or any other ptrace-based debugger to attach to the
//! launcher. The tracer stays attached across exec, so it ends up debugging
//! the entry point.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use super::{Attachment, DebugFacility, DebuggerError};

pub(super) const NAME: &str = "ptrace";

/// Pid of the attached tracer
pub const TRACER_PID_ENV_VAR: &str = "DEBUG_TRACER_PID";

const STATUS_PATH: &str = "/proc/self/status";

pub struct PtraceFacility {
    status_path: PathBuf,
    poll_interval: Duration,
}

impl PtraceFacility {
    /// Check that tracer status can be observed on this system
    ///
    /// Without procfs there is no way to notice an attach, so the facility
    /// counts as not found.
    pub fn probe(poll_interval: Duration) -> Result<Self, DebuggerError> {
        Self::probe_at(STATUS_PATH, poll_interval)
    }

    /// Probe against a specific status file
    pub fn probe_at(status_path: impl Into<PathBuf>, poll_interval: Duration) -> Result<Self, DebuggerError> {
        let status_path = status_path.into();
        let supported = std::fs::read_to_string(&status_path)
            .map(|status| parse_tracer_pid(&status).is_some())
            .unwrap_or(false);

        if !supported {
            tracing::debug!(path = ?status_path, "no TracerPid available");
            return Err(DebuggerError::NotFound {
                name: NAME.to_string(),
            });
        }

        Ok(Self {
            status_path,
            poll_interval,
        })
    }

    /// Current tracer pid, 0 when untraced
    fn tracer_pid(&self) -> Result<u32, DebuggerError> {
        let status = std::fs::read_to_string(&self.status_path).map_err(DebuggerError::Procfs)?;
        parse_tracer_pid(&status).ok_or_else(|| {
            DebuggerError::Procfs(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "TracerPid missing from status",
            ))
        })
    }
}

impl DebugFacility for PtraceFacility {
    fn name(&self) -> &str {
        NAME
    }

    fn enable_attach(&mut self) -> Result<(), DebuggerError> {
        allow_any_tracer();
        tracing::info!(pid = std::process::id(), "waiting for ptrace attach");
        Ok(())
    }

    fn wait_for_attach(&mut self) -> Result<Attachment, DebuggerError> {
        loop {
            let tracer = self.tracer_pid()?;
            if tracer != 0 {
                tracing::info!(tracer, "debugger attached");
                return Ok(Attachment {
                    facility: NAME.to_string(),
                    peer: format!("pid {tracer}"),
                    env: vec![(TRACER_PID_ENV_VAR.to_string(), tracer.to_string())],
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

/// Let non-ancestor debuggers attach under Yama ptrace_scope=1
#[cfg(target_os = "linux")]
fn allow_any_tracer() {
    use rustix::process::{set_ptracer, PTracer};

    match set_ptracer(PTracer::Any) {
        Ok(()) => {}
        // No Yama LSM: every permitted tracer may already attach
        Err(e) if e == rustix::io::Errno::INVAL => tracing::debug!("Yama not active"),
        Err(e) => tracing::warn!(error = %e, "failed to allow ptrace attach"),
    }
}

#[cfg(not(target_os = "linux"))]
fn allow_any_tracer() {}

/// Extract the `TracerPid:` value from a `/proc/<pid>/status` document
pub fn parse_tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STATUS: &str = "Name:\tcatalyst-launch\nState:\tS (sleeping)\nTgid:\t4242\nPid:\t4242\nPPid:\t1\nTracerPid:\t0\nUid:\t1000\t1000\t1000\t1000\n";

    #[test]
    fn parses_untraced_status() {
        assert_eq!(parse_tracer_pid(STATUS), Some(0));
    }

    #[test]
    fn parses_traced_status() {
        let traced = STATUS.replace("TracerPid:\t0", "TracerPid:\t31337");
        assert_eq!(parse_tracer_pid(&traced), Some(31337));
    }

    #[test]
    fn missing_field_is_none() {
        assert_eq!(parse_tracer_pid("Name:\tx\nPid:\t1\n"), None);
        assert_eq!(parse_tracer_pid("TracerPid:\tgarbage\n"), None);
    }

    #[test]
    fn probe_without_status_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = PtraceFacility::probe_at(dir.path().join("status"), Duration::from_millis(1));
        assert!(matches!(result, Err(DebuggerError::NotFound { name }) if name == "ptrace"));
    }

    #[test]
    fn attach_is_observed_after_polling() {
        let mut status = tempfile::NamedTempFile::new().unwrap();
        status.write_all(STATUS.as_bytes()).unwrap();
        let path = status.path().to_path_buf();

        let mut facility = PtraceFacility::probe_at(&path, Duration::from_millis(5)).unwrap();
        facility.enable_attach().unwrap();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            let traced = STATUS.replace("TracerPid:\t0", "TracerPid:\t777");
            // Swap the whole file so the poller never sees a partial write
            let staged = path.with_extension("staged");
            std::fs::write(&staged, traced).unwrap();
            std::fs::rename(&staged, &path).unwrap();
        });

        let attachment = facility.wait_for_attach().unwrap();
        writer.join().unwrap();

        assert_eq!(attachment.facility, "ptrace");
        assert_eq!(attachment.peer, "pid 777");
        assert_eq!(
            attachment.env,
            vec![(TRACER_PID_ENV_VAR.to_string(), "777".to_string())]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn probe_succeeds_on_linux() {
        let facility = PtraceFacility::probe(Duration::from_millis(10)).unwrap();
        assert_eq!(facility.name(), "ptrace");
    }
}
