//! 可发生判定：对当前标识求值，不缓存、不修改任何状态。
//!
//! 迁移 `t` 可发生当且仅当：
//! * 每条普通输入弧 `(p, t)` 满足 `M[p] >= w`；
//! * 每条抑制弧 `(p, t)` 满足 `M[p] < w`；
//! * 每条输出弧 `(t, p)` 若 `p` 有容量 `K`，则 `M[p] + w <= K`。
//!
//! 复位弧不参与判定。
use crate::net::error::NetError;
use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::model::Net;
use crate::net::structure::{Arc, ArcKind, Marking, Weight};

/// One unmet enabling condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    InsufficientTokens {
        arc: ArcId,
        place: PlaceId,
        required: Weight,
        available: Weight,
    },
    Inhibited {
        arc: ArcId,
        place: PlaceId,
        threshold: Weight,
        available: Weight,
    },
    WouldExceedCapacity {
        arc: ArcId,
        place: PlaceId,
        produced: Weight,
        available: Weight,
        capacity: Weight,
    },
}

impl Net {
    pub fn is_enabled(&self, transition: TransitionId) -> Result<bool, NetError> {
        Ok(self.blockers(transition)?.is_empty())
    }

    /// Every condition that currently keeps `transition` from firing, in arc order.
    pub fn blockers(&self, transition: TransitionId) -> Result<Vec<Blocker>, NetError> {
        self.transition(transition)?;
        Ok(self.blockers_under(transition, &self.marking))
    }

    /// 可发生迁移集合，按优先级降序排列，同优先级按插入顺序。
    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.enabled_under(&self.marking)
    }

    pub(crate) fn enabled_under(&self, marking: &Marking) -> Vec<TransitionId> {
        let mut enabled: Vec<_> = self
            .transitions
            .values()
            .filter(|transition| self.blockers_under(transition.id, marking).is_empty())
            .map(|transition| (transition.priority, transition.id))
            .collect();
        // Stable sort keeps insertion order within one priority tier.
        enabled.sort_by(|left, right| right.0.cmp(&left.0));
        enabled.into_iter().map(|(_, id)| id).collect()
    }

    pub(crate) fn blockers_under(&self, transition: TransitionId, marking: &Marking) -> Vec<Blocker> {
        let mut blockers = Vec::new();
        for arc in self.input_arcs(transition) {
            if let Some(blocker) = input_blocker(arc, marking) {
                blockers.push(blocker);
            }
        }
        for arc in self.output_arcs(transition) {
            let Some(place) = arc.target.as_place() else {
                continue;
            };
            let Some(capacity) = self.places.get(&place).and_then(|p| p.capacity) else {
                continue;
            };
            let available = marking.tokens(place);
            if available.saturating_add(arc.weight) > capacity {
                blockers.push(Blocker::WouldExceedCapacity {
                    arc: arc.id,
                    place,
                    produced: arc.weight,
                    available,
                    capacity,
                });
            }
        }
        blockers
    }
}

fn input_blocker(arc: &Arc, marking: &Marking) -> Option<Blocker> {
    let place = arc.source.as_place()?;
    let available = marking.tokens(place);
    match arc.kind {
        ArcKind::Normal if available < arc.weight => Some(Blocker::InsufficientTokens {
            arc: arc.id,
            place,
            required: arc.weight,
            available,
        }),
        ArcKind::Inhibitor if available >= arc.weight => Some(Blocker::Inhibited {
            arc: arc.id,
            place,
            threshold: arc.weight,
            available,
        }),
        ArcKind::Normal | ArcKind::Inhibitor | ArcKind::Reset => None,
    }
}
