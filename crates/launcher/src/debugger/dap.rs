//! Debug Adapter Protocol attach listener
//!
//! Binds a TCP socket and waits for a debug adapter client (VS Code and
//! friends) to connect. The launcher does not speak DAP itself: the accepted
//! connection is left open across exec and its descriptor handed to the entry
//! point, which continues the session.

use std::net::{SocketAddr, TcpListener, TcpStream};

use super::{Attachment, DebugFacility, DebuggerError};

pub(super) const NAME: &str = "dap";

/// Descriptor of the accepted debugger connection
pub const ADAPTER_FD_ENV_VAR: &str = "DEBUG_ADAPTER_FD";

/// Remote address of the accepted debugger connection
pub const ADAPTER_PEER_ENV_VAR: &str = "DEBUG_ADAPTER_PEER";

pub struct DapListener {
    address: String,
    listener: Option<TcpListener>,
    /// Kept open so the descriptor stays valid for the entry point
    connection: Option<TcpStream>,
}

impl DapListener {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            listener: None,
            connection: None,
        }
    }

    /// Address actually bound, once `enable_attach` has run
    ///
    /// Differs from the configured address when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// The accepted debugger connection, if any
    pub fn connection(&self) -> Option<&TcpStream> {
        self.connection.as_ref()
    }
}

impl DebugFacility for DapListener {
    fn name(&self) -> &str {
        NAME
    }

    fn enable_attach(&mut self) -> Result<(), DebuggerError> {
        let listener = TcpListener::bind(&self.address).map_err(|source| DebuggerError::Bind {
            address: self.address.clone(),
            source,
        })?;
        tracing::info!(address = %self.address, local = ?listener.local_addr().ok(), "listening for debugger");
        self.listener = Some(listener);
        Ok(())
    }

    fn wait_for_attach(&mut self) -> Result<Attachment, DebuggerError> {
        let listener = self.listener.as_ref().ok_or(DebuggerError::NotEnabled)?;

        let (stream, peer) = listener.accept().map_err(DebuggerError::Accept)?;
        tracing::info!(%peer, "debugger connected");

        let mut env = vec![(ADAPTER_PEER_ENV_VAR.to_string(), peer.to_string())];
        if let Some(fd) = inherit_across_exec(&stream)? {
            env.push((ADAPTER_FD_ENV_VAR.to_string(), fd.to_string()));
        }

        // One debugger per launch
        self.listener = None;
        self.connection = Some(stream);

        Ok(Attachment {
            facility: NAME.to_string(),
            peer: peer.to_string(),
            env,
        })
    }
}

/// Clear close-on-exec so the entry point inherits the connection
#[cfg(unix)]
fn inherit_across_exec(stream: &TcpStream) -> Result<Option<i32>, DebuggerError> {
    use std::os::fd::AsRawFd;

    use rustix::io::{fcntl_getfd, fcntl_setfd, FdFlags};

    let flags = fcntl_getfd(stream).map_err(|e| DebuggerError::Handoff(e.into()))?;
    fcntl_setfd(stream, flags - FdFlags::CLOEXEC).map_err(|e| DebuggerError::Handoff(e.into()))?;
    Ok(Some(stream.as_raw_fd()))
}

#[cfg(not(unix))]
fn inherit_across_exec(_stream: &TcpStream) -> Result<Option<i32>, DebuggerError> {
    Ok(None)
}
