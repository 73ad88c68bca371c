//! Binary address and hostname-glob matching, grounded in
//! `examples/original_source/cvsyncd/access.c`'s
//! `access_set_ipv4addr`/`access_set_ipv6addr`/`access_match_ipv4addr`/
//! `access_match_ipv6addr`/`access_match_hostname`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use globset::{Glob, GlobMatcher};

use crate::error::AccessError;

/// What one ACL entry's pattern matches against.
#[derive(Debug, Clone)]
pub enum AddressMatcher {
    /// A masked IPv4 network.
    Ipv4 {
        /// The network address, already masked.
        net: u32,
        /// The prefix mask.
        mask: u32,
    },
    /// A masked IPv6 network.
    Ipv6 {
        /// The network address, already masked, 16 bytes.
        net: [u8; 16],
        /// The prefix mask, 16 bytes.
        mask: [u8; 16],
    },
    /// A reverse-DNS hostname glob, matched with `fnmatch`-equivalent
    /// semantics (the peer's hostname must be resolved by the caller;
    /// this crate does not perform DNS lookups).
    Hostname(GlobMatcher),
}

impl AddressMatcher {
    /// Parses `pattern` as a dotted IPv4 or colon-form IPv6 address with
    /// an optional `/prefix_len`, falling back to a hostname glob when it
    /// is neither (mirrors `access_parse_address`'s `inet_pton` probing
    /// before `access_parse_hostname`).
    pub fn parse(pattern: &str, prefix_len: Option<u32>) -> Result<Self, ()> {
        if let Ok(v4) = pattern.parse::<Ipv4Addr>() {
            let bits = u32::from(v4);
            let prefix = prefix_len.unwrap_or(32).min(32);
            let mask = mask32(prefix);
            return Ok(AddressMatcher::Ipv4 {
                net: bits & mask,
                mask,
            });
        }
        if let Ok(v6) = pattern.parse::<Ipv6Addr>() {
            let prefix = prefix_len.unwrap_or(128).min(128);
            let mask = mask128(prefix);
            let addr = v6.octets();
            let mut net = [0u8; 16];
            for i in 0..16 {
                net[i] = addr[i] & mask[i];
            }
            return Ok(AddressMatcher::Ipv6 { net, mask });
        }
        Err(())
    }

    /// Compiles a hostname glob pattern. Rejected if `prefix_len` was
    /// given (a hostname has no address prefix) by the caller before
    /// reaching here, or if the pattern contains `:` (would have parsed
    /// as IPv6) — both checked in [`crate::parse::parse`].
    pub fn hostname(pattern: &str) -> Result<Self, globset::Error> {
        Glob::new(pattern).map(|glob| AddressMatcher::Hostname(glob.compile_matcher()))
    }

    /// True if `addr` falls within this matcher's network, or `false` for
    /// a hostname matcher (use [`AddressMatcher::matches_hostname`]
    /// instead).
    #[must_use]
    pub fn matches_addr(&self, addr: IpAddr) -> bool {
        match (self, addr) {
            (AddressMatcher::Ipv4 { net, mask }, IpAddr::V4(v4)) => {
                (u32::from(v4) & mask) == *net
            }
            (AddressMatcher::Ipv6 { net, mask }, IpAddr::V6(v6)) => {
                let octets = v6.octets();
                (0..16).all(|i| (octets[i] & mask[i]) == net[i])
            }
            _ => false,
        }
    }

    /// True if this is a hostname matcher and `host` matches its glob.
    #[must_use]
    pub fn matches_hostname(&self, host: &str) -> bool {
        match self {
            AddressMatcher::Hostname(matcher) => matcher.is_match(host),
            _ => false,
        }
    }
}

fn mask32(prefix: u32) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

fn mask128(prefix: u32) -> [u8; 16] {
    let mut mask = [0u8; 16];
    let full_bytes = (prefix / 8) as usize;
    for byte in mask.iter_mut().take(full_bytes) {
        *byte = 0xff;
    }
    let remaining_bits = prefix % 8;
    if remaining_bits != 0 && full_bytes < 16 {
        mask[full_bytes] = 0xffu8 << (8 - remaining_bits);
    }
    mask
}
