//! 发生规则：在同一份标识快照上重新判定可发生性并一次性提交结果。
//!
//! `M'[p] = M[p] - Pre[p, t]`（普通输入弧），复位弧令 `M'[p] = 0`，
//! 随后 `M'[p] += Post[p, t]`，超出容量时截断并报告 [`CapacityExceeded`]。
use std::sync::{Arc as SharedPtr, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::net::enabling::Blocker;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::model::Net;
use crate::net::structure::{ArcKind, Marking, Weight};
use crate::net::validation::ValidationReport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("transition {0} does not exist")]
    UnknownTransition(TransitionId),
    #[error("transition {transition} is not enabled under the current marking")]
    NotEnabled {
        transition: TransitionId,
        blockers: Vec<Blocker>,
    },
}

/// Non-fatal: an output arc pushed a place past its capacity and the result was clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub place: PlaceId,
    pub attempted: Weight,
    pub capacity: Weight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenChange {
    pub place: PlaceId,
    pub before: Weight,
    pub after: Weight,
}

impl TokenChange {
    pub fn delta(&self) -> i64 {
        self.after as i64 - self.before as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    pub transition: TransitionId,
    pub changes: Vec<TokenChange>,
    pub clamped: Vec<CapacityExceeded>,
}

impl Net {
    /// 激发迁移。失败时标识保证不变。
    pub fn fire(&mut self, transition: TransitionId) -> Result<FireOutcome, FireError> {
        let (next, clamped) = self.fire_under(&self.marking, transition)?;
        let changes = self
            .marking
            .iter()
            .filter_map(|(place, before)| {
                let after = next.tokens(place);
                (before != after).then_some(TokenChange {
                    place,
                    before,
                    after,
                })
            })
            .collect();
        for clamp in &clamped {
            log::warn!(
                "firing {} would put {} tokens in {} (capacity {}), clamped",
                transition,
                clamp.attempted,
                clamp.place,
                clamp.capacity
            );
        }
        self.commit_marking(next);
        log::debug!("fired {} -> {:?}", transition, self.marking);
        Ok(FireOutcome {
            transition,
            changes,
            clamped,
        })
    }

    /// Computes the successor marking of `marking` without touching the net.
    pub(crate) fn fire_under(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<(Marking, Vec<CapacityExceeded>), FireError> {
        if !self.transitions.contains_key(&transition) {
            return Err(FireError::UnknownTransition(transition));
        }
        let blockers = self.blockers_under(transition, marking);
        if !blockers.is_empty() {
            return Err(FireError::NotEnabled {
                transition,
                blockers,
            });
        }

        let mut next = marking.clone();
        for arc in self.input_arcs(transition) {
            let Some(place) = arc.source.as_place() else {
                continue;
            };
            match arc.kind {
                ArcKind::Normal => {
                    let tokens = next.tokens(place);
                    next.set(place, tokens.saturating_sub(arc.weight));
                }
                ArcKind::Reset => next.set(place, 0),
                ArcKind::Inhibitor => {}
            }
        }

        let mut clamped = Vec::new();
        for arc in self.output_arcs(transition) {
            let Some(place) = arc.target.as_place() else {
                continue;
            };
            let attempted = next.tokens(place).saturating_add(arc.weight);
            let capacity = self.places.get(&place).and_then(|p| p.capacity);
            match capacity {
                Some(capacity) if attempted > capacity => {
                    clamped.push(CapacityExceeded {
                        place,
                        attempted,
                        capacity,
                    });
                    next.set(place, capacity);
                }
                _ => next.set(place, attempted),
            }
        }
        Ok((next, clamped))
    }
}

/// 多线程共享的网：判定与激发在同一把锁内完成。
#[derive(Debug, Clone, Default)]
pub struct SharedNet(SharedPtr<Mutex<Net>>);

impl SharedNet {
    pub fn new(net: Net) -> Self {
        Self(SharedPtr::new(Mutex::new(net)))
    }

    fn lock(&self) -> MutexGuard<'_, Net> {
        // The marking is swapped in one assignment, so a poisoned net is still consistent.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fire(&self, transition: TransitionId) -> Result<FireOutcome, FireError> {
        self.lock().fire(transition)
    }

    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.lock().enabled_transitions()
    }

    pub fn validate(&self) -> ValidationReport {
        self.lock().validate()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Net) -> R) -> R {
        f(&self.lock())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Net) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{ArcSpec, PlaceSpec, TransitionSpec};

    #[test]
    fn firing_moves_tokens_and_reports_changes() {
        let mut net = Net::empty();
        let a = net.add_place(PlaceSpec::new("A").with_tokens(3)).unwrap().id;
        let b = net.add_place(PlaceSpec::new("B")).unwrap().id;
        let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
        net.add_arc(ArcSpec::new(a, t).with_weight(2)).unwrap();
        net.add_arc(ArcSpec::new(t, b).with_weight(3)).unwrap();

        let outcome = net.fire(t).unwrap();
        assert_eq!(net.tokens(a).unwrap(), 1);
        assert_eq!(net.tokens(b).unwrap(), 3);
        assert_eq!(outcome.changes.len(), 2);
        assert_eq!(outcome.changes[0].delta(), -2);
        assert!(outcome.clamped.is_empty());
    }

    #[test]
    fn two_output_arcs_into_one_place_are_clamped() {
        let mut net = Net::empty();
        let b = net
            .add_place(PlaceSpec::new("B").with_tokens(0).with_capacity(3))
            .unwrap()
            .id;
        let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
        net.add_arc(ArcSpec::new(t, b).with_weight(2)).unwrap();
        net.add_arc(ArcSpec::new(t, b).with_weight(2)).unwrap();

        assert!(net.is_enabled(t).unwrap());
        let outcome = net.fire(t).unwrap();
        assert_eq!(net.tokens(b).unwrap(), 3);
        assert_eq!(
            outcome.clamped,
            vec![CapacityExceeded {
                place: b,
                attempted: 4,
                capacity: 3
            }]
        );
    }

    #[test]
    fn self_loop_with_reset_refills_after_clearing() {
        let mut net = Net::empty();
        let p = net.add_place(PlaceSpec::new("p").with_tokens(7)).unwrap().id;
        let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
        net.add_arc(ArcSpec::reset(p, t)).unwrap();
        net.add_arc(ArcSpec::new(t, p)).unwrap();
        net.fire(t).unwrap();
        assert_eq!(net.tokens(p).unwrap(), 1);
    }

    #[test]
    fn unknown_transition_is_reported() {
        let mut net = Net::empty();
        assert_eq!(
            net.fire(TransitionId::new(4)),
            Err(FireError::UnknownTransition(TransitionId::new(4)))
        );
    }

    #[test]
    fn shared_net_fires_under_one_lock() {
        let mut net = Net::empty();
        let p = net.add_place(PlaceSpec::new("p").with_tokens(1)).unwrap().id;
        let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
        net.add_arc(ArcSpec::new(p, t)).unwrap();
        let shared = SharedNet::new(net);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.fire(t).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(shared.with(|net| net.tokens(p).unwrap()), 0);
        assert!(shared.validate().deadlock);
    }
}
