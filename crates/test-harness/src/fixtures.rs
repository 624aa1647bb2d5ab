//! Test fixtures for common launch scenarios

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use launcher::config::DebuggerConfig;
use launcher::{Attachment, DebugFacility, DebugMode, DebuggerError, EntryPoint, FacilityLoader};

/// Facility name used by the fakes
pub const FAKE_FACILITY: &str = "fake";

/// Something observable that happened during a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Load,
    Enable,
    Wait,
    Attached,
    /// Entry point ran; `peer` is set when a debugger attached first
    Entry { peer: Option<String> },
}

/// Shared, thread-safe event record
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        tracing::trace!(?event, "recorded");
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    /// Number of entry point invocations
    pub fn entry_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Entry { .. }))
            .count()
    }
}

/// Releases a gated `FakeFacility`, standing in for a debugger attaching
pub struct AttachHandle(Sender<()>);

impl AttachHandle {
    pub fn attach(&self) {
        // The facility may already be gone if the launch failed
        let _ = self.0.send(());
    }
}

/// Debug facility that records calls instead of touching sockets or procfs
pub struct FakeFacility {
    log: EventLog,
    gate: Option<Receiver<()>>,
    fail_enable: bool,
}

impl DebugFacility for FakeFacility {
    fn name(&self) -> &str {
        FAKE_FACILITY
    }

    fn enable_attach(&mut self) -> Result<(), DebuggerError> {
        self.log.push(Event::Enable);
        if self.fail_enable {
            return Err(DebuggerError::Bind {
                address: "fake:0".to_string(),
                source: std::io::ErrorKind::AddrInUse.into(),
            });
        }
        Ok(())
    }

    fn wait_for_attach(&mut self) -> Result<Attachment, DebuggerError> {
        self.log.push(Event::Wait);
        if let Some(gate) = &self.gate {
            gate.recv().map_err(|_| {
                DebuggerError::Accept(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "attach handle dropped",
                ))
            })?;
        }
        self.log.push(Event::Attached);
        Ok(Attachment {
            facility: FAKE_FACILITY.to_string(),
            peer: "fake-debugger".to_string(),
            env: vec![("DEBUG_FAKE".to_string(), "1".to_string())],
        })
    }
}

/// Loader handing out `FakeFacility`s, or reporting the facility as missing
pub struct FakeLoader {
    log: EventLog,
    available: bool,
    fail_enable: bool,
    gate: Mutex<Option<Receiver<()>>>,
}

impl FakeLoader {
    /// Facility loads and a debugger attaches immediately
    pub fn available(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            available: true,
            fail_enable: false,
            gate: Mutex::new(None),
        }
    }

    /// Facility cannot be found
    pub fn missing(log: &EventLog) -> Self {
        Self {
            available: false,
            ..Self::available(log)
        }
    }

    /// Facility loads but cannot start listening
    pub fn failing_enable(log: &EventLog) -> Self {
        Self {
            fail_enable: true,
            ..Self::available(log)
        }
    }

    /// Facility loads and waits until the returned handle attaches
    pub fn gated(log: &EventLog) -> (Self, AttachHandle) {
        let (tx, rx) = mpsc::channel();
        let loader = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::available(log)
        };
        (loader, AttachHandle(tx))
    }
}

impl FacilityLoader for FakeLoader {
    fn load(&self, _config: &DebuggerConfig) -> Result<Box<dyn DebugFacility>, DebuggerError> {
        self.log.push(Event::Load);
        if !self.available {
            return Err(DebuggerError::NotFound {
                name: FAKE_FACILITY.to_string(),
            });
        }
        Ok(Box::new(FakeFacility {
            log: self.log.clone(),
            gate: self.gate.lock().unwrap().take(),
            fail_enable: self.fail_enable,
        }))
    }
}

/// Entry point that records its invocation
pub struct RecordingEntry {
    log: EventLog,
}

impl RecordingEntry {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl EntryPoint for RecordingEntry {
    type Output = Option<Attachment>;

    fn invoke(self, attachment: Option<&Attachment>) -> Self::Output {
        self.log.push(Event::Entry {
            peer: attachment.map(|a| a.peer.clone()),
        });
        attachment.cloned()
    }
}

/// Resolve a debug mode the way the binary does, from explicit inputs
pub fn debug_mode(env_value: Option<&str>, args: &[&str]) -> DebugMode {
    DebugMode::resolve(env_value.map(std::ffi::OsStr::new), args)
}
