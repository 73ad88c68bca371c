//! `cvsyncd` process orchestration: argument parsing, tracing subscriber
//! setup, configuration loading, and the accept loop's entry point.
//!
//! Grounded in `examples/oferchen-rsync/bin/oc-rsyncd/src/main.rs`'s thin
//! `main` (delegating straight into a library `run`/`exit_code_from` pair)
//! and `examples/oferchen-rsync/crates/cli/src/lib.rs`'s `run` signature,
//! generalized to cvsyncd's own argument surface (`SPEC_FULL.md` §9/§10).
//!
//! Process lifecycle (signal-triggered graceful shutdown) is not modeled:
//! [`Listener::serve`] takes a shutdown flag so tests can stop it
//! deterministically, but `run` itself serves until the process is killed,
//! matching how an external supervisor (inetd-style or a service manager)
//! is expected to manage the daemon's lifetime.

#![deny(missing_docs)]

mod acl_file;
mod config;
mod error;
mod listener;
mod local;
mod session;

pub use acl_file::AclFile;
pub use config::{DaemonConfig, GlobalConfig, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
pub use error::{ConfigError, DaemonError};
pub use listener::Listener;
pub use local::FsLocalLookup;
pub use session::{SessionPolicy, run as run_session};

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use cvsync_checksums::Algorithm;

/// The largest exit status a POSIX process can report.
const MAX_EXIT_CODE: i32 = 255;

/// Digest algorithms `cvsyncd` can be configured to offer.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum HashArg {
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// RIPEMD-160.
    Ripemd160,
}

impl From<HashArg> for Algorithm {
    fn from(value: HashArg) -> Self {
        match value {
            HashArg::Md5 => Algorithm::Md5,
            HashArg::Sha1 => Algorithm::Sha1,
            HashArg::Ripemd160 => Algorithm::Ripemd160,
        }
    }
}

/// `cvsyncd`'s command-line surface.
#[derive(Parser, Debug)]
#[command(name = "cvsyncd", about = "cvsync protocol daemon")]
struct Args {
    /// Path to the `cvsyncd.conf`-style configuration file.
    #[arg(long, default_value = "/etc/cvsyncd.conf")]
    config: PathBuf,

    /// Overrides the listen address (`host:port`); defaults to
    /// `0.0.0.0:<port>` with `port` taken from the configuration file.
    #[arg(long)]
    listen: Option<String>,

    /// Default ACL file consulted when the configuration file declares
    /// none (`access` global directive).
    #[arg(long)]
    access: Option<PathBuf>,

    /// Digest algorithm this server offers during hash negotiation.
    #[arg(long, value_enum, default_value = "md5")]
    hash: HashArg,

    /// Disables zlib compression negotiation even when a client requests
    /// it.
    #[arg(long)]
    no_compress: bool,

    /// Increases log verbosity; may be repeated.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppresses all logging below warnings.
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn install_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_directive = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("CVSYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn resolve_listen_addr(args: &Args, global: &GlobalConfig) -> Result<SocketAddr, DaemonError> {
    let spec = match &args.listen {
        Some(listen) => listen.clone(),
        None => format!("0.0.0.0:{}", global.port),
    };
    spec.to_socket_addrs()?
        .next()
        .ok_or_else(|| DaemonError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address resolved")))
}

fn run_inner(args: Args) -> Result<(), DaemonError> {
    install_tracing(args.verbose, args.quiet);

    let contents = fs::read_to_string(&args.config)?;
    let config = Arc::new(DaemonConfig::parse(&contents)?);

    let access_path = config
        .global
        .access_file
        .clone()
        .or_else(|| args.access.as_ref().map(|p| p.display().to_string()))
        .unwrap_or_default();
    let acl = AclFile::new(access_path);

    let addr = resolve_listen_addr(&args, &config.global)?;
    let hash_algorithm: Algorithm = args.hash.into();
    let compression_allowed = !args.no_compress;

    tracing::info!(%addr, collections = config.collections.len(), "starting cvsyncd");

    let listener = Arc::new(Listener::bind(addr, config, acl, hash_algorithm, compression_allowed)?);
    let shutdown = AtomicBool::new(false);
    listener.serve(&shutdown)
}

/// Runs `cvsyncd` against `arguments`, writing diagnostics to `stdout`/
/// `stderr`, and returns a process exit status (`0` on a clean shutdown,
/// non-zero otherwise).
pub fn run<I, S, Out, Err>(arguments: I, _stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let args = match Args::try_parse_from(arguments) {
        Ok(args) => args,
        Err(clap_error) => {
            let _ = write!(stderr, "{clap_error}");
            return clap_error.exit_code();
        }
    };

    match run_inner(args) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(stderr, "cvsyncd: {error}");
            1
        }
    }
}

/// Converts a numeric exit code into a [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}
