//! One accepted connection's full lifecycle: protocol negotiation, mux
//! handoff, and the scan/compare dialogue driven against a real collection
//! tree via [`FsLocalLookup`].
//!
//! Grounded in `examples/original_source/cvsyncd/proto.c`'s `server_main`
//! (negotiation order) and `filecmp_rcs` (the `UPDATE_RCS` sub-dialogue
//! this module drives via [`cvsync_scan::update_rcs`]).

use std::io::Write as _;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use cvsync_checksums::Algorithm;
use cvsync_compress::Codec;
use cvsync_core::attr::FileType;
use cvsync_protocol::channel::{establish_server, local_mss};
use cvsync_protocol::collection::{exchange_server, ServerCollection};
use cvsync_protocol::error::ErrorReason;
use cvsync_protocol::{compress, hash, version};
use cvsync_rcs::RcsNum;
use cvsync_scan::compare::{diff_revisions, reconcile};
use cvsync_scan::content::{ContentPayload, RevisionBody};
use cvsync_scan::update_rcs::{read_digest_list, AdminSnapshot};
use cvsync_scan::{CompareCommand, EntryRecord, LocalLookup, ScanCommand};
use cvsync_transport::{ChannelStream, Mux};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::local::FsLocalLookup;

/// Sub-channel 0: the scan/compare command dialogue.
const SCAN_CHANNEL: usize = 0;
/// Sub-channel 1: file bodies and RCS revision content.
const CONTENT_CHANNEL: usize = 1;

/// The policy inputs a listener resolves once per accepted connection,
/// before handing the socket to [`run`].
pub struct SessionPolicy<'a> {
    /// The ACL decision already reached for this peer; `Err` refuses the
    /// session during version negotiation.
    pub admission: Result<(), ErrorReason>,
    /// The single digest algorithm this server's configuration accepts.
    pub hash_algorithm: Algorithm,
    /// Whether this server's policy permits zlib compression at all.
    pub compression_allowed: bool,
    /// The collection table this session resolves requests against.
    pub config: &'a DaemonConfig,
}

/// Runs one session end to end: negotiation, mux handoff, then the
/// scan/compare dialogue for each collection the client successfully
/// requested, in the order granted.
pub fn run(stream: TcpStream, policy: SessionPolicy<'_>) -> Result<(), DaemonError> {
    stream.set_nodelay(true).ok();
    let mut io = stream.try_clone()?;

    let proto = version::negotiate_server(&mut io, policy.admission)?;
    let hash_algorithm = hash::negotiate_server(&mut io, policy.hash_algorithm)?;
    let granted = exchange_server(&mut io, |name, release| lookup_collection(policy.config, name, release))?;
    let codec = compress::negotiate_server(&mut io, proto, policy.compression_allowed)?;
    let mss = local_mss(proto, codec);
    let channels = establish_server(&mut io, mss)?;
    drop(io);

    let reader = stream.try_clone()?;
    let shutdown_handle = stream.try_clone()?;
    let mux = Mux::spawn(reader, stream, channels.in_channels, channels.out_channels, codec, move || {
        let _ = shutdown_handle.shutdown(Shutdown::Both);
    });

    for (name, _release) in &granted {
        let Some(collection) = policy.config.collection(name) else {
            continue;
        };
        let local = FsLocalLookup::new(collection);
        let mut scan_io = ChannelStream::new(Arc::clone(&mux), SCAN_CHANNEL);
        let mut content_io = ChannelStream::new(Arc::clone(&mux), CONTENT_CHANNEL);
        drive_collection(&mut scan_io, &mut content_io, &local, hash_algorithm)?;
    }

    mux.close_in(SCAN_CHANNEL)?;
    mux.close_in(CONTENT_CHANNEL)?;
    mux.close_out(SCAN_CHANNEL)?;
    mux.close_out(CONTENT_CHANNEL)?;
    mux.join();
    Ok(())
}

fn lookup_collection(
    config: &DaemonConfig,
    name: &[u8],
    release: cvsync_core::collection::Release,
) -> Option<ServerCollection> {
    let collection = config.collection(name)?;
    if collection.release != release {
        return None;
    }
    Some(ServerCollection {
        policy_umask: collection.umask,
        rprefix: collection
            .rprefix
            .as_ref()
            .map(|p| p.as_bytes().to_vec())
            .unwrap_or_default(),
    })
}

/// Drives one collection's scan/compare stream to completion: reads
/// [`ScanCommand`]s from `scan_io` until `END`, reconciling each against
/// `local` and writing back the resulting [`CompareCommand`]s, shipping
/// bodies on `content_io` as each reply demands.
fn drive_collection<W: std::io::Write + Send + 'static>(
    scan_io: &mut ChannelStream<W>,
    content_io: &mut ChannelStream<W>,
    local: &FsLocalLookup<'_>,
    hash_algorithm: Algorithm,
) -> Result<(), DaemonError> {
    loop {
        let command = ScanCommand::read(scan_io)?;
        let is_end = matches!(command, ScanCommand::End);
        let replies = reconcile(&command, local);

        for reply in replies {
            reply.write(scan_io)?;

            match &reply {
                CompareCommand::Add(record) | CompareCommand::Update(record) => {
                    ship_generic_body(content_io, local, record)?;
                }
                CompareCommand::UpdateRcs(record) => {
                    run_update_rcs(scan_io, content_io, local, hash_algorithm, record)?;
                }
                CompareCommand::Remove(_) | CompareCommand::SetAttr(_) | CompareCommand::UpdateEnd => {}
            }
        }

        if is_end {
            break;
        }
    }
    Ok(())
}

/// Ships an `ADD`/`UPDATE` entry's raw bytes on the content channel.
/// Directories and symlinks carry everything they need in their
/// attribute blob already, so only file-bearing filetypes ship a body.
fn ship_generic_body<W: std::io::Write + Send + 'static>(
    content_io: &mut ChannelStream<W>,
    local: &FsLocalLookup<'_>,
    record: &EntryRecord,
) -> Result<(), DaemonError> {
    if !matches!(record.filetype, FileType::File | FileType::Rcs | FileType::RcsAttic) {
        return Ok(());
    }
    let bytes = local.read_file(&record.name)?;
    ContentPayload::FileBody(bytes).write(content_io)?;
    content_io.flush()?;
    Ok(())
}

/// Drives the `UPDATE_RCS` sub-dialogue for one record: reads the peer's
/// admin snapshot and both digest lists, diffs them against the server's
/// own copy, ships the mismatching revisions in full, and closes with
/// `UPDATE_END`.
fn run_update_rcs<W: std::io::Write + Send + 'static>(
    scan_io: &mut ChannelStream<W>,
    content_io: &mut ChannelStream<W>,
    local: &FsLocalLookup<'_>,
    hash_algorithm: Algorithm,
    record: &EntryRecord,
) -> Result<(), DaemonError> {
    let _peer_admin = AdminSnapshot::read(scan_io)?;
    let peer_delta = read_digest_list(scan_io)?;
    let peer_deltatext = read_digest_list(scan_io)?;

    let (admin, bodies) = if let Some((local_delta, local_deltatext)) =
        local.rcs_digests(&record.name, hash_algorithm)
    {
        let mut mismatched: Vec<RcsNum> = diff_revisions(&local_delta, &peer_delta);
        for num in diff_revisions(&local_deltatext, &peer_deltatext) {
            if !mismatched.contains(&num) {
                mismatched.push(num);
            }
        }

        let bytes = local.read_file(&record.name)?;
        let parsed = cvsync_rcs::parse(&bytes)?;
        let bodies: Vec<RevisionBody> = mismatched
            .iter()
            .filter_map(|num| parsed.delta.iter().find(|revision| &revision.num == num))
            .map(RevisionBody::from_revision)
            .collect();
        (Some(AdminSnapshot::from_admin(&parsed.admin)), bodies)
    } else {
        (None, Vec::new())
    };

    // Always shipped, even when `revisions` is empty: the client reads
    // exactly one content frame per UPDATE_RCS reply before the closing
    // UPDATE_END, so the reply stream stays self-describing without a
    // non-blocking peek on the mux. The admin header travels alongside
    // the revisions it describes (S5: a head move with no revision
    // content change still needs to reach the peer).
    ContentPayload::RcsRevisions { admin, revisions: bodies }.write(content_io)?;
    content_io.flush()?;

    CompareCommand::UpdateEnd.write(scan_io)?;
    Ok(())
}
