//! One `cvsync` invocation's full lifecycle: protocol negotiation, mux
//! handoff, and the scan/compare dialogue driven against the local
//! destination tree for each granted collection.
//!
//! Grounded in `crates/daemon/src/session.rs`'s `run`/`drive_collection`
//! (the server-side counterpart this module mirrors) and
//! `examples/original_source/cvsync/proto.c`'s `client_main`.
//!
//! The scan/compare dialogue runs two threads per collection, rather than
//! the daemon's single read-reconcile-reply loop: the writer streams this
//! side's [`ScanCommand`]s (plus, for every RCS entry, the admin snapshot
//! and digest lists `run_update_rcs` on the other end expects next) while
//! the reader applies each [`CompareCommand`] reply as it arrives. Nothing
//! here waits for a round trip before sending the next command — the
//! mapping from an RCS `UPDATE` to an `UPDATE_RCS` reply depends only on
//! `record.filetype.is_rcs()`, which this side already knows.

use std::fs;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use cvsync_checksums::Algorithm;
use cvsync_core::collection::Release;
use cvsync_filters::RefuseList;
use cvsync_protocol::channel::{establish_client, local_mss};
use cvsync_protocol::collection::{exchange_client, CollectionRequest};
use cvsync_protocol::{compress, hash, version};
use cvsync_scan::update_rcs::write_digest_list;
use cvsync_scan::{CompareCommand, ScanCommand};
use cvsync_transport::{ChannelStream, Mux};

use crate::config::{ClientConfig, CollectionTarget};
use crate::error::CliError;
use crate::{apply, walk};

/// Sub-channel 0: the scan/compare command dialogue.
const SCAN_CHANNEL: usize = 0;
/// Sub-channel 1: file bodies and RCS revision content.
const CONTENT_CHANNEL: usize = 1;

/// Connects to `config.host:config.port`, negotiates the protocol, and
/// syncs every requested collection in order.
pub fn run(config: &ClientConfig) -> Result<(), CliError> {
    let stream = TcpStream::connect((config.host.as_str(), config.port))?;
    stream.set_nodelay(true).ok();
    let mut io = stream.try_clone()?;

    let proto = version::negotiate_client(&mut io)?;
    let hash_algorithm = hash::negotiate_client(&mut io, config.hash_preference)?;

    let requests: Vec<CollectionRequest> = config
        .collections
        .iter()
        .map(|target| CollectionRequest {
            name: target.name.clone(),
            release: target.release,
            requested_umask: target.requested_umask,
        })
        .collect();
    let grants = exchange_client(&mut io, &requests)?;

    let codec = compress::negotiate_client(&mut io, proto, config.compress_preference)?;
    let mss = local_mss(proto, codec);
    let channels = establish_client(&mut io, mss)?;
    drop(io);

    let reader = stream.try_clone()?;
    let shutdown_handle = stream.try_clone()?;
    let mux = Mux::spawn(reader, stream, channels.in_channels, channels.out_channels, codec, move || {
        let _ = shutdown_handle.shutdown(Shutdown::Both);
    });

    let refuse = match &config.refuse_file {
        Some(path) => RefuseList::parse(&fs::read_to_string(path)?)?,
        None => RefuseList::empty(),
    };

    for (target, grant) in config.collections.iter().zip(&grants) {
        if grant.is_none() {
            return Err(CliError::CollectionRefused {
                name: String::from_utf8_lossy(&target.name).into_owned(),
            });
        }
        if target.release != Release::Rcs {
            continue;
        }
        sync_collection(&mux, target, &refuse, hash_algorithm)?;
    }

    mux.close_in(SCAN_CHANNEL)?;
    mux.close_in(CONTENT_CHANNEL)?;
    mux.close_out(SCAN_CHANNEL)?;
    mux.close_out(CONTENT_CHANNEL)?;
    mux.join();
    Ok(())
}

/// Syncs one granted collection: builds this run's [`ScanCommand`] stream
/// from the local tree, drives it against the server over the mux, and
/// persists the resulting catalog.
fn sync_collection<W>(
    mux: &Arc<Mux<W>>,
    target: &CollectionTarget,
    refuse: &RefuseList,
    hash_algorithm: Algorithm,
) -> Result<(), CliError>
where
    W: std::io::Write + Send + 'static,
{
    fs::create_dir_all(&target.destination)?;
    let catalog = walk::load_catalog(&target.catalog_path)?;
    let manifest = match &target.manifest_path {
        Some(path) => walk::load_manifest(path)?,
        None => Vec::new(),
    };
    let current = walk::scan_local_tree(&target.destination, refuse)?;
    let commands = walk::build_scan_commands(&current, &catalog, &manifest);

    let mut scan_writer = ChannelStream::new(Arc::clone(mux), SCAN_CHANNEL);
    let mut scan_reader = ChannelStream::new(Arc::clone(mux), SCAN_CHANNEL);
    let mut content_reader = ChannelStream::new(Arc::clone(mux), CONTENT_CHANNEL);
    let destination = target.destination.as_path();

    std::thread::scope(|scope| -> Result<(), CliError> {
        let writer = scope.spawn(|| -> Result<(), CliError> {
            for command in &commands {
                write_scan_command(&mut scan_writer, command, destination, hash_algorithm)?;
            }
            Ok(())
        });

        let reader = scope.spawn(|| -> Result<(), CliError> {
            loop {
                let command = CompareCommand::read(&mut scan_reader)?;
                match &command {
                    CompareCommand::Add(record) | CompareCommand::Update(record) => {
                        apply::apply_add_or_update(destination, record, &mut content_reader)?;
                    }
                    CompareCommand::Remove(record) => {
                        apply::apply_remove(destination, record)?;
                    }
                    CompareCommand::SetAttr(record) => {
                        apply::apply_set_attr(destination, record)?;
                    }
                    CompareCommand::UpdateRcs(record) => {
                        apply::apply_update_rcs(destination, record, &mut scan_reader, &mut content_reader)?;
                    }
                    CompareCommand::UpdateEnd => break,
                }
            }
            Ok(())
        });

        writer.join().unwrap_or_else(|_| Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "scan writer thread panicked",
        ))))?;
        reader.join().unwrap_or_else(|_| Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "scan reader thread panicked",
        ))))?;
        Ok(())
    })?;

    walk::save_catalog(&target.catalog_path, &current)?;
    Ok(())
}

/// Writes one [`ScanCommand`]; for an RCS `UPDATE`, immediately follows it
/// with this side's own admin snapshot and both digest lists, since
/// `reconcile`'s `UPDATE` → `UPDATE_RCS` mapping depends only on the
/// record's filetype, which the peer determines from the same command we
/// just sent.
fn write_scan_command<W>(
    scan_writer: &mut ChannelStream<W>,
    command: &ScanCommand,
    destination: &std::path::Path,
    hash_algorithm: Algorithm,
) -> Result<(), CliError>
where
    W: std::io::Write + Send + 'static,
{
    if let ScanCommand::Update(record) = command {
        if record.filetype.is_rcs() {
            let path = apply::resolve(destination, &record.name);
            let (admin, delta_digests, deltatext_digests) = apply::local_rcs_snapshot(&path, hash_algorithm)?;
            command.write(scan_writer)?;
            admin.write(scan_writer)?;
            write_digest_list(scan_writer, &delta_digests)?;
            write_digest_list(scan_writer, &deltatext_digests)?;
            return Ok(());
        }
    }
    command.write(scan_writer)?;
    Ok(())
}
