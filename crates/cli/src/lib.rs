//! `cvsync` process orchestration: argument parsing, tracing subscriber
//! setup, and the client session's entry point.
//!
//! Grounded in `crates/daemon/src/lib.rs`'s `Args`/`run`/`exit_code_from`
//! triple, generalized to `cvsync`'s own argument surface (`SPEC_FULL.md`
//! §9/§10): a server address, one or more collection names, and a
//! destination directory each collection mirrors into.

#![deny(missing_docs)]

mod apply;
mod config;
mod error;
mod session;
mod walk;

pub use apply::local_rcs_snapshot;
pub use config::{ClientConfig, CollectionTarget};
pub use error::{ApplyError, CliError};
pub use session::run as run_session;
pub use walk::{build_scan_commands, load_catalog, save_catalog, scan_local_tree, Snapshot};

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use cvsync_checksums::Algorithm;
use cvsync_compress::Codec;
use cvsync_core::collection::{Release, ALL_PERMS};

/// The largest exit status a POSIX process can report.
const MAX_EXIT_CODE: i32 = 255;

/// The default `cvsync` server port.
const DEFAULT_PORT: u16 = 7777;

/// Digest algorithms `cvsync` can be configured to prefer.
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

/// Compression preferences `cvsync` can be asked to offer.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CodecArg {
    /// No compression.
    None,
    /// Per-frame zlib compression.
    Zlib,
}

impl From<CodecArg> for Codec {
    fn from(value: CodecArg) -> Self {
        match value {
            CodecArg::None => Codec::None,
            CodecArg::Zlib => Codec::Zlib,
        }
    }
}

/// `cvsync`'s command-line surface.
#[derive(Parser, Debug)]
#[command(name = "cvsync", about = "cvsync protocol client")]
struct Args {
    /// Server hostname or address.
    host: String,

    /// Collection names to request, in the order they should be synced.
    #[arg(required = true)]
    collections: Vec<String>,

    /// Local directory each collection mirrors into a same-named
    /// subdirectory of.
    #[arg(short = 'd', long)]
    destination: PathBuf,

    /// Server TCP port.
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Umask this client asks the server to apply to newly created
    /// entries; ANDed server-side with the collection's own policy.
    #[arg(long, default_value = "022")]
    umask: String,

    /// Digest algorithm this client prefers during hash negotiation.
    #[arg(long, value_enum, default_value = "md5")]
    hash: HashArg,

    /// Compression codec this client prefers during compression
    /// negotiation.
    #[arg(long, value_enum, default_value = "none")]
    compress: CodecArg,

    /// Path to a refuse file applied to every requested collection.
    #[arg(long)]
    refuse_file: Option<PathBuf>,

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

fn parse_umask(raw: &str) -> Result<u16, CliError> {
    u16::from_str_radix(raw, 8)
        .map(|mask| mask & ALL_PERMS)
        .map_err(|_| CliError::InvalidArgument(format!("invalid umask {raw:?}")))
}

fn build_config(args: &Args) -> Result<ClientConfig, CliError> {
    let requested_umask = parse_umask(&args.umask)?;
    let collections = args
        .collections
        .iter()
        .map(|name| ClientConfig::target_for(name, Release::Rcs, requested_umask, &args.destination))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClientConfig {
        host: args.host.clone(),
        port: args.port,
        collections,
        hash_preference: args.hash.into(),
        compress_preference: args.compress.into(),
        refuse_file: args.refuse_file.clone(),
    })
}

fn run_inner(args: Args) -> Result<(), CliError> {
    install_tracing(args.verbose, args.quiet);
    let config = build_config(&args)?;
    tracing::info!(host = %config.host, port = config.port, collections = config.collections.len(), "starting cvsync");
    session::run(&config)
}

/// Runs `cvsync` against `arguments`, writing diagnostics to `stdout`/
/// `stderr`, and returns a process exit status (`0` on success, non-zero
/// otherwise).
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
            let _ = writeln!(stderr, "cvsync: {error}");
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
