//! The daemon's accept loop: binds a listening socket, admits each peer
//! against the current ACL policy, and dispatches one thread per session.
//!
//! Grounded in `examples/original_source/cvsyncd/server.c`'s accept loop: a
//! blocking accept with a periodic wake so a shutdown flag can be polled
//! between connections (`spec.md` §5's "readiness primitive with a
//! 1-second periodic wake").

use std::net::{IpAddr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket2::{Domain, Socket, Type};

use tracing::{info, warn};

use cvsync_access::{evaluate, ConnectionTracker, Peer, Refusal};
use cvsync_checksums::Algorithm;
use cvsync_protocol::error::ErrorReason;

use crate::acl_file::AclFile;
use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::session::{self, SessionPolicy};

/// How long one [`Listener::serve`] accept call blocks before re-checking
/// its shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn refusal_to_reason(refusal: Refusal) -> ErrorReason {
    match refusal {
        Refusal::Denied => ErrorReason::Denied,
        Refusal::GlobalLimited | Refusal::RuleLimited => ErrorReason::Limited,
    }
}

/// Owns the listening socket and the shared ACL/accounting state every
/// accepted connection is checked against.
pub struct Listener {
    socket: Socket,
    config: Arc<DaemonConfig>,
    acl: Mutex<AclFile>,
    tracker: Mutex<ConnectionTracker>,
    hash_algorithm: Algorithm,
    compression_allowed: bool,
}

impl Listener {
    /// Binds `addr` and builds a listener ready to [`Listener::serve`].
    pub fn bind(
        addr: SocketAddr,
        config: Arc<DaemonConfig>,
        acl: AclFile,
        hash_algorithm: Algorithm,
        compression_allowed: bool,
    ) -> Result<Self, DaemonError> {
        let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(128)?;
        socket.set_read_timeout(Some(ACCEPT_POLL_INTERVAL))?;

        let global_max = config.global.maxclients;
        Ok(Self {
            socket,
            config,
            acl: Mutex::new(acl),
            tracker: Mutex::new(ConnectionTracker::new(global_max)),
            hash_algorithm,
            compression_allowed,
        })
    }

    /// Runs the accept loop until `shutdown` is observed set. Each accepted
    /// connection is admitted against the current ACL rules (reloaded from
    /// disk only if its mtime advanced, per [`AclFile`]) and dispatched to
    /// its own thread.
    pub fn serve(self: &Arc<Self>, shutdown: &AtomicBool) -> Result<(), DaemonError> {
        while !shutdown.load(Ordering::Relaxed) {
            let (socket, addr) = match self.socket.accept() {
                Ok(pair) => pair,
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(err) => return Err(DaemonError::Io(err)),
            };
            let stream: TcpStream = socket.into();
            let peer_addr = addr
                .as_socket()
                .map(|s| s.ip())
                .unwrap_or(IpAddr::from([0, 0, 0, 0]));
            self.dispatch(stream, peer_addr);
        }
        Ok(())
    }

    fn dispatch(self: &Arc<Self>, stream: TcpStream, peer_addr: IpAddr) {
        let listener = Arc::clone(self);
        std::thread::spawn(move || listener.run_one(stream, peer_addr));
    }

    fn run_one(&self, stream: TcpStream, peer_addr: IpAddr) {
        let peer = Peer {
            addr: peer_addr,
            hostname: None,
        };

        let rules = {
            let mut acl = self.acl.lock().unwrap_or_else(|p| p.into_inner());
            acl.rules().map(<[_]>::to_vec).unwrap_or_default()
        };
        let decision = evaluate(&rules, peer);

        let admission = {
            let mut tracker = self.tracker.lock().unwrap_or_else(|p| p.into_inner());
            tracker.admit(decision, &rules)
        };

        let (handle, policy_admission) = match admission {
            Ok(handle) => (Some(handle), Ok(())),
            Err(refusal) => (None, Err(refusal_to_reason(refusal))),
        };

        match policy_admission {
            Ok(()) => info!(%peer_addr, "admitted connection"),
            Err(reason) => warn!(%peer_addr, ?reason, "refused connection"),
        }

        let policy = SessionPolicy {
            admission: policy_admission,
            hash_algorithm: self.hash_algorithm,
            compression_allowed: self.compression_allowed,
            config: &self.config,
        };

        if let Err(err) = session::run(stream, policy) {
            warn!(%peer_addr, error = %err, "session ended with an error");
        }

        if let Some(handle) = handle {
            let mut tracker = self.tracker.lock().unwrap_or_else(|p| p.into_inner());
            tracker.release(handle);
        }
    }
}
