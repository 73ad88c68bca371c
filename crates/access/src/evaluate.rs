//! Matching a peer against a compiled ACL, grounded in `access_match`.

use std::net::IpAddr;

use crate::rule::{AclRule, Verb};

/// A peer to evaluate: its numeric address, plus an already reverse-
/// resolved hostname if one is available. Hostname-pattern rules only
/// ever match when `hostname` is `Some`; this crate performs no DNS
/// resolution itself (`spec.md` declares the network/resolver layer out
/// of scope).
#[derive(Debug, Clone, Copy)]
pub struct Peer<'a> {
    /// The peer's numeric address.
    pub addr: IpAddr,
    /// The peer's reverse-resolved hostname, if known.
    pub hostname: Option<&'a str>,
}

/// The outcome of matching a [`Peer`] against an ordered rule list.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    /// No rule matched, or the first matching rule was `ALLOW`.
    /// `rule_index` identifies the matched rule for per-rule cap
    /// accounting, or `None` when no rule matched at all (unrestricted
    /// ALLOW, per `access_authorize`'s `aclp == NULL` default).
    Allow {
        /// Index into the rule slice that was evaluated, if any matched.
        rule_index: Option<usize>,
    },
    /// The first matching rule was `ALWAYS`.
    Always {
        /// Index of the matched rule.
        rule_index: usize,
    },
    /// The first matching rule was `DENY`.
    Deny,
}

/// Walks `rules` in order and returns the first match's verb, or
/// [`Decision::Allow`] with `rule_index: None` if nothing matched
/// (`access_match`'s `aclp == NULL` path defaults to `ACL_ALLOW`).
#[must_use]
pub fn evaluate(rules: &[AclRule], peer: Peer<'_>) -> Decision {
    for (index, rule) in rules.iter().enumerate() {
        let matched = rule.matcher.matches_addr(peer.addr)
            || peer
                .hostname
                .is_some_and(|host| rule.matcher.matches_hostname(host));
        if !matched {
            continue;
        }
        return match rule.verb {
            Verb::Allow => Decision::Allow {
                rule_index: Some(index),
            },
            Verb::Always => Decision::Always { rule_index: index },
            Verb::Deny => Decision::Deny,
        };
    }
    Decision::Allow { rule_index: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn first_matching_rule_wins() {
        let rules = parse("deny 10.0.0.1\nallow 10.0.0.0/8\n").unwrap();
        let peer = Peer {
            addr: "10.0.0.1".parse().unwrap(),
            hostname: None,
        };
        assert_eq!(evaluate(&rules, peer), Decision::Deny);
    }

    #[test]
    fn unmatched_peer_defaults_to_allow() {
        let rules = parse("deny 10.0.0.1\n").unwrap();
        let peer = Peer {
            addr: "192.168.1.1".parse().unwrap(),
            hostname: None,
        };
        assert_eq!(evaluate(&rules, peer), Decision::Allow { rule_index: None });
    }

    #[test]
    fn hostname_rule_requires_resolved_hostname() {
        let rules = parse("deny *.untrusted.example\n").unwrap();
        let unresolved = Peer {
            addr: "1.2.3.4".parse().unwrap(),
            hostname: None,
        };
        assert_eq!(
            evaluate(&rules, unresolved),
            Decision::Allow { rule_index: None }
        );

        let resolved = Peer {
            addr: "1.2.3.4".parse().unwrap(),
            hostname: Some("host.untrusted.example"),
        };
        assert_eq!(evaluate(&rules, resolved), Decision::Deny);
    }
}
