//! Per-rule and global connection accounting, grounded in
//! `access_authorize`/`access_done`'s `acl`/`acl_high`/`acl_actives`
//! bookkeeping.

use crate::evaluate::Decision;
use crate::rule::AclRule;

/// A reason a connection was refused.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Refusal {
    /// An ACL rule's verb was `DENY`.
    Denied,
    /// The server's global `maxclients` cap was already reached.
    GlobalLimited,
    /// The matched rule's own `,max` cap was already reached.
    RuleLimited,
}

/// An admitted connection's slot, returned by [`ConnectionTracker::admit`]
/// and required by [`ConnectionTracker::release`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionHandle(usize);

#[derive(Debug, Clone, Copy)]
struct Active {
    rule_index: Option<usize>,
    always: bool,
}

/// Tracks currently-admitted connections so `ALLOW`'s per-rule and global
/// caps can be enforced, while `ALWAYS` connections bypass both
/// (`spec.md` §4.5, §13).
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    global_max: Option<u32>,
    active: Vec<Option<Active>>,
}

impl ConnectionTracker {
    /// Creates a tracker with the given global `maxclients` cap (`None`
    /// for unlimited).
    #[must_use]
    pub fn new(global_max: Option<u32>) -> Self {
        Self {
            global_max,
            active: Vec::new(),
        }
    }

    /// Number of currently admitted connections counted against the
    /// global cap (excludes `ALWAYS` connections).
    #[must_use]
    pub fn global_active(&self) -> usize {
        self.active
            .iter()
            .filter(|slot| slot.is_some_and(|a| !a.always))
            .count()
    }

    fn rule_active(&self, rule_index: usize) -> usize {
        self.active
            .iter()
            .filter(|slot| slot.is_some_and(|a| !a.always && a.rule_index == Some(rule_index)))
            .count()
    }

    /// Attempts to admit a connection per its evaluated [`Decision`].
    ///
    /// - `Decision::Deny` always fails with [`Refusal::Denied`].
    /// - `Decision::Always` always succeeds, uncounted.
    /// - `Decision::Allow` fails with [`Refusal::GlobalLimited`] if the
    ///   global cap is already saturated, then with
    ///   [`Refusal::RuleLimited`] if the matched rule's own `max` is
    ///   already saturated.
    pub fn admit(
        &mut self,
        decision: Decision,
        rules: &[AclRule],
    ) -> Result<ConnectionHandle, Refusal> {
        match decision {
            Decision::Deny => Err(Refusal::Denied),
            Decision::Always { rule_index } => {
                Ok(self.insert(Active {
                    rule_index: Some(rule_index),
                    always: true,
                }))
            }
            Decision::Allow { rule_index } => {
                if let Some(global_max) = self.global_max {
                    if self.global_active() >= global_max as usize {
                        return Err(Refusal::GlobalLimited);
                    }
                }
                if let Some(index) = rule_index {
                    if let Some(max) = rules[index].max {
                        if self.rule_active(index) >= max as usize {
                            return Err(Refusal::RuleLimited);
                        }
                    }
                }
                Ok(self.insert(Active {
                    rule_index,
                    always: false,
                }))
            }
        }
    }

    fn insert(&mut self, active: Active) -> ConnectionHandle {
        if let Some(index) = self.active.iter().position(Option::is_none) {
            self.active[index] = Some(active);
            ConnectionHandle(index)
        } else {
            self.active.push(Some(active));
            ConnectionHandle(self.active.len() - 1)
        }
    }

    /// Releases a connection previously admitted by [`Self::admit`].
    pub fn release(&mut self, handle: ConnectionHandle) {
        if let Some(slot) = self.active.get_mut(handle.0) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{evaluate, Peer};
    use crate::parse::parse;

    #[test]
    fn global_cap_rejects_once_saturated() {
        let rules = parse("allow 10.0.0.0/8\n").unwrap();
        let mut tracker = ConnectionTracker::new(Some(1));
        let peer = Peer {
            addr: "10.0.0.1".parse().unwrap(),
            hostname: None,
        };
        let decision = evaluate(&rules, peer);
        let first = tracker.admit(decision, &rules).unwrap();
        assert_eq!(tracker.admit(decision, &rules), Err(Refusal::GlobalLimited));
        tracker.release(first);
        assert!(tracker.admit(decision, &rules).is_ok());
    }

    #[test]
    fn always_bypasses_global_cap() {
        let rules = parse("always 10.0.0.0/8\n").unwrap();
        let mut tracker = ConnectionTracker::new(Some(1));
        let peer = Peer {
            addr: "10.0.0.1".parse().unwrap(),
            hostname: None,
        };
        let decision = evaluate(&rules, peer);
        tracker.admit(decision, &rules).unwrap();
        tracker.admit(decision, &rules).unwrap();
        assert_eq!(tracker.global_active(), 0);
    }

    #[test]
    fn rule_max_rejects_independent_of_global_cap() {
        let rules = parse("allow 10.0.0.0/8,1\n").unwrap();
        let mut tracker = ConnectionTracker::new(None);
        let peer = Peer {
            addr: "10.0.0.1".parse().unwrap(),
            hostname: None,
        };
        let decision = evaluate(&rules, peer);
        tracker.admit(decision, &rules).unwrap();
        assert_eq!(tracker.admit(decision, &rules), Err(Refusal::RuleLimited));
    }
}
