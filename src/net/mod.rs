//! # Petri 网执行核心（Place/Transition Net，含抑制弧、复位弧与容量）
//!
//! 网由库所集合 `P`、迁移集合 `T` 与带权弧构成，二部性由 [`Net::add_arc`] 保证。
//! 对任意标识 `M`：
//!
//! * 迁移 `t` **可发生** 当且仅当：
//!   1. 每条普通输入弧 `(p, t)`：`M[p] >= w`；
//!   2. 每条抑制弧 `(p, t)`：`M[p] < w`；
//!   3. 每条输出弧 `(t, p)`，若 `p` 有容量 `K`：`M[p] + w <= K`；
//! * 迁移 **发生** 后，普通输入弧扣除令牌，复位弧把库所清零，输出弧产生令牌，
//!   超出容量时截断并报告 [`CapacityExceeded`]。
//!
//! 标识与结构分离存放，便于回滚；可发生集按优先级降序、同级按插入顺序给出。
//!
//! ## 示例
//!
//! ```rust
//! use pnsim::net::*;
//!
//! let mut net = Net::empty();
//! let a = net.add_place(PlaceSpec::new("A").with_tokens(2).with_capacity(5)).unwrap().id;
//! let b = net.add_place(PlaceSpec::new("B")).unwrap().id;
//! let t1 = net.add_transition(TransitionSpec::new("T1")).unwrap().id;
//!
//! net.add_arc(ArcSpec::new(a, t1).with_weight(2)).unwrap();
//! net.add_arc(ArcSpec::new(t1, b)).unwrap();
//!
//! assert_eq!(net.enabled_transitions(), vec![t1]);
//! net.fire(t1).unwrap();
//! assert_eq!(net.tokens(a).unwrap(), 0);
//! assert_eq!(net.tokens(b).unwrap(), 1);
//! assert!(net.validate().deadlock);
//! ```

pub mod dot;
pub mod enabling;
pub mod error;
pub mod firing;
pub mod ids;
pub mod io;
pub mod model;
pub mod structure;
pub mod validation;

pub use enabling::Blocker;
pub use error::{ArcViolation, NetError};
pub use firing::{CapacityExceeded, FireError, FireOutcome, SharedNet, TokenChange};
pub use ids::{ArcId, EntityRef, NodeRef, ParseIdError, PlaceId, TransitionId};
pub use io::{IoError, NetSnapshot};
pub use model::Net;
pub use structure::{
    Arc, ArcKind, ArcSpec, ArcUpdate, Marking, Place, PlaceSpec, PlaceUpdate, Priority,
    Transition, TransitionKind, TransitionSpec, TransitionUpdate, Weight,
};
pub use validation::{DiagnosticReport, ValidationReport};
