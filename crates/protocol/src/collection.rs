//! Collection-list exchange, grounded in `collection_exchange_list`/
//! `collection_exchange_rcs`/`collectionlist_exchange` (client,
//! `examples/original_source/cvsync/proto.c`) and `collectionlist_exchange`/
//! `collection_fetch` (server, `cvsyncd/proto.c`).

use std::io::{Read, Write};

use cvsync_core::collection::{Release, ALL_PERMS};
use cvsync_core::wire::{read_u16, read_u8_prefixed, write_u16, write_u8_prefixed};

use crate::error::ProtocolError;
use crate::io::{read_message, write_message};

/// The `(".", ".")` sentinel record that terminates the exchange in both
/// directions.
fn sentinel() -> Vec<u8> {
    let mut out = Vec::new();
    write_u8_prefixed(&mut out, b".").expect("single byte fits a u8 prefix");
    write_u8_prefixed(&mut out, b".").expect("single byte fits a u8 prefix");
    out
}

fn is_sentinel(name: &[u8], release: &[u8]) -> bool {
    name == b"." && release == b"."
}

/// One collection the client asks the server to serve.
#[derive(Clone, Debug)]
pub struct CollectionRequest {
    /// The collection's name.
    pub name: Vec<u8>,
    /// The release type (`list` or `rcs`).
    pub release: Release,
    /// The umask the client wants applied; only meaningful for `rcs`
    /// collections, ignored (and omitted from the wire record) for `list`.
    pub requested_umask: u16,
}

/// The server's reply to one [`CollectionRequest`], or `None` if the server
/// has no such collection.
#[derive(Clone, Debug)]
pub struct CollectionGrant {
    /// The collection's name, echoed back.
    pub name: Vec<u8>,
    /// The release type, echoed back.
    pub release: Release,
    /// `requested_umask & server_policy_umask`; `0` for `list` releases.
    pub granted_umask: u16,
    /// The server's remote prefix for this collection (empty for `list`).
    pub rprefix: Vec<u8>,
}

fn encode_request(request: &CollectionRequest) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    write_u8_prefixed(&mut out, &request.name).map_err(ProtocolError::Wire)?;
    write_u8_prefixed(&mut out, request.release.as_str().as_bytes()).map_err(ProtocolError::Wire)?;
    if request.release == Release::Rcs {
        write_u16(&mut out, request.requested_umask & ALL_PERMS);
    }
    Ok(out)
}

/// Client side: sends one request per entry in `requests`, in order,
/// collecting a grant (or `None` for a collection the server doesn't
/// serve) for each, then exchanges the terminating sentinel.
pub fn exchange_client<S: Read + Write>(
    io: &mut S,
    requests: &[CollectionRequest],
) -> Result<Vec<Option<CollectionGrant>>, ProtocolError> {
    let mut grants = Vec::with_capacity(requests.len());

    for request in requests {
        write_message(io, &encode_request(request)?)?;

        let body = read_message(io)?;
        if body.is_empty() {
            grants.push(None);
            continue;
        }
        let (name, rest) = read_u8_prefixed(&body).map_err(ProtocolError::Wire)?;
        let (release_bytes, rest) = read_u8_prefixed(rest).map_err(ProtocolError::Wire)?;
        let release = Release::parse(release_bytes).ok_or(ProtocolError::MalformedCollectionRecord {
            release: "unknown",
        })?;
        if name != request.name.as_slice() || release != request.release {
            return Err(ProtocolError::MalformedCollectionRecord {
                release: request.release.as_str(),
            });
        }

        let (granted_umask, rprefix) = match release {
            Release::List => (0, Vec::new()),
            Release::Rcs => {
                let (umask_bytes, rprefix) = read_u16(rest).map_err(ProtocolError::Wire)?;
                (umask_bytes, rprefix.to_vec())
            }
        };

        grants.push(Some(CollectionGrant {
            name: name.to_vec(),
            release,
            granted_umask,
            rprefix,
        }));
    }

    write_message(io, &sentinel())?;
    let body = read_message(io)?;
    let (name, rest) = read_u8_prefixed(&body).map_err(ProtocolError::Wire)?;
    let (release, _) = read_u8_prefixed(rest).map_err(ProtocolError::Wire)?;
    if !is_sentinel(name, release) {
        return Err(ProtocolError::MissingCollectionTerminator);
    }

    Ok(grants)
}

/// What the server's collection table reports for one requested
/// `(name, release)` pair.
#[derive(Clone, Debug)]
pub struct ServerCollection {
    /// The server-side umask policy to AND against the client's request.
    pub policy_umask: u16,
    /// The remote prefix to advertise for this collection.
    pub rprefix: Vec<u8>,
}

/// Server side: loops receiving client requests until the sentinel,
/// calling `lookup` for each to decide whether (and how) to grant it, then
/// replies with the terminating sentinel. Returns the collections the
/// client successfully requested.
pub fn exchange_server<S, F>(
    io: &mut S,
    mut lookup: F,
) -> Result<Vec<(Vec<u8>, Release)>, ProtocolError>
where
    S: Read + Write,
    F: FnMut(&[u8], Release) -> Option<ServerCollection>,
{
    let mut granted = Vec::new();

    loop {
        let body = read_message(io)?;
        let (name, rest) = read_u8_prefixed(&body).map_err(ProtocolError::Wire)?;
        let (release_bytes, rest) = read_u8_prefixed(rest).map_err(ProtocolError::Wire)?;

        if is_sentinel(name, release_bytes) {
            write_message(io, &sentinel())?;
            return Ok(granted);
        }

        let release = Release::parse(release_bytes).ok_or(ProtocolError::MalformedCollectionRecord {
            release: "unknown",
        })?;

        let requested_umask = match release {
            Release::List => {
                if !rest.is_empty() {
                    return Err(ProtocolError::MalformedCollectionRecord { release: "list" });
                }
                0
            }
            Release::Rcs => {
                let (umask, trailer) = read_u16(rest).map_err(ProtocolError::Wire)?;
                if !trailer.is_empty() {
                    return Err(ProtocolError::MalformedCollectionRecord { release: "rcs" });
                }
                umask
            }
        };

        match lookup(name, release) {
            None => write_message(io, &[])?,
            Some(info) => {
                let mut out = Vec::new();
                write_u8_prefixed(&mut out, name).map_err(ProtocolError::Wire)?;
                write_u8_prefixed(&mut out, release_bytes).map_err(ProtocolError::Wire)?;
                if release == Release::Rcs {
                    let granted_umask = requested_umask & info.policy_umask & ALL_PERMS;
                    write_u16(&mut out, granted_umask);
                    out.extend_from_slice(&info.rprefix);
                }
                write_message(io, &out)?;
                granted.push((name.to_vec(), release));
            }
        }
    }
}
