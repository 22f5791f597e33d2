//! 结构性错误：非法弧、未知实体与容量违例。
use thiserror::Error;

use crate::net::ids::{EntityRef, NodeRef, PlaceId, TransitionId};
use crate::net::structure::{ArcKind, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArcViolation {
    #[error("arc connects {from} to {to}, which are on the same side of the net")]
    SameSide { from: NodeRef, to: NodeRef },
    #[error("{kind:?} arc must run from a place to a transition")]
    WrongDirection { kind: ArcKind },
    #[error("arc weight must be at least 1")]
    ZeroWeight,
    #[error("a {kind:?} arc from {from} to {to} already exists")]
    Duplicate {
        from: NodeRef,
        to: NodeRef,
        kind: ArcKind,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetError {
    #[error("unknown {0}")]
    UnknownEntity(EntityRef),
    #[error("invalid arc: {0}")]
    InvalidArc(#[from] ArcViolation),
    #[error("place {place} would hold {tokens} tokens, above its capacity {capacity}")]
    CapacityViolation {
        place: PlaceId,
        tokens: Weight,
        capacity: Weight,
    },
    #[error("transition {transition} needs a positive finite delay mean, got {delay_mean}")]
    InvalidDelay {
        transition: TransitionId,
        delay_mean: f64,
    },
    #[error("{0} appears more than once")]
    DuplicateId(EntityRef),
    #[error("marking does not cover exactly the places of the net")]
    MarkingMismatch,
}
