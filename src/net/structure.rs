//! 网的静态结构元素：库所、迁移、弧与标识（marking）。
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::net::ids::{ArcId, NodeRef, PlaceId, TransitionId};

pub type Weight = u64;
pub type Priority = u32;

pub const DEFAULT_PRIORITY: Priority = 1;
pub const DEFAULT_DELAY_MEAN: f64 = 1.0;
pub const DEFAULT_TOKEN_COLOR: &str = "#000000";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: PlaceId,
    pub label: String,
    /// `None` means unbounded.
    pub capacity: Option<Weight>,
    /// Display only.
    pub token_color: String,
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Place")
            .field(&self.id)
            .field(&self.label)
            .field(&self.capacity)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    Immediate,
    /// Fires after an exponentially distributed delay with mean `delay_mean`.
    Timed,
}

impl TransitionKind {
    pub fn is_timed(self) -> bool {
        matches!(self, TransitionKind::Timed)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: TransitionId,
    pub label: String,
    pub kind: TransitionKind,
    pub delay_mean: f64,
    /// Higher fires first.
    pub priority: Priority,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.id)
            .field(&self.label)
            .field(&self.kind)
            .field(&self.priority)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArcKind {
    #[default]
    Normal,
    /// Place→Transition only; blocks while the place holds `>= weight` tokens.
    Inhibitor,
    /// Place→Transition only; empties the place on firing.
    Reset,
}

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Arc {
    pub id: ArcId,
    #[serde(rename = "sourceId")]
    pub source: NodeRef,
    #[serde(rename = "targetId")]
    pub target: NodeRef,
    pub weight: Weight,
    pub kind: ArcKind,
}

impl Arc {
    /// The place end of the arc, whichever direction it runs.
    pub fn place(&self) -> Option<PlaceId> {
        self.source.as_place().or_else(|| self.target.as_place())
    }

    pub fn transition(&self) -> Option<TransitionId> {
        self.source
            .as_transition()
            .or_else(|| self.target.as_transition())
    }

    pub fn touches(&self, node: NodeRef) -> bool {
        self.source == node || self.target == node
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("weight", &self.weight)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Request for a new place. The net assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceSpec {
    pub label: String,
    pub tokens: Weight,
    pub capacity: Option<Weight>,
    pub token_color: String,
}

impl PlaceSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tokens: 0,
            capacity: None,
            token_color: DEFAULT_TOKEN_COLOR.to_string(),
        }
    }

    pub fn with_tokens(mut self, tokens: Weight) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_capacity(mut self, capacity: Weight) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_token_color(mut self, color: impl Into<String>) -> Self {
        self.token_color = color.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSpec {
    pub label: String,
    pub kind: TransitionKind,
    pub delay_mean: f64,
    pub priority: Priority,
}

impl TransitionSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: TransitionKind::Immediate,
            delay_mean: DEFAULT_DELAY_MEAN,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn timed(label: impl Into<String>, delay_mean: f64) -> Self {
        Self {
            kind: TransitionKind::Timed,
            delay_mean,
            ..Self::new(label)
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcSpec {
    pub source: NodeRef,
    pub target: NodeRef,
    pub weight: Weight,
    pub kind: ArcKind,
}

impl ArcSpec {
    pub fn new(source: impl Into<NodeRef>, target: impl Into<NodeRef>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1,
            kind: ArcKind::Normal,
        }
    }

    pub fn inhibitor(place: PlaceId, transition: TransitionId) -> Self {
        Self::new(place, transition).with_kind(ArcKind::Inhibitor)
    }

    pub fn reset(place: PlaceId, transition: TransitionId) -> Self {
        Self::new(place, transition).with_kind(ArcKind::Reset)
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_kind(mut self, kind: ArcKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Partial edit of a place; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceUpdate {
    pub label: Option<String>,
    /// `Some(None)` removes the capacity.
    pub capacity: Option<Option<Weight>>,
    pub token_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionUpdate {
    pub label: Option<String>,
    pub kind: Option<TransitionKind>,
    pub delay_mean: Option<f64>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcUpdate {
    pub weight: Option<Weight>,
    pub kind: Option<ArcKind>,
}

/// Token count per place, in place insertion order.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking(pub IndexMap<PlaceId, Weight>);

impl Marking {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Weight)> + '_ {
        self.0.iter().map(|(place, tokens)| (*place, *tokens))
    }

    pub fn get(&self, place: PlaceId) -> Option<Weight> {
        self.0.get(&place).copied()
    }

    /// Tokens held by `place`; absent places hold none.
    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.get(place).unwrap_or(0)
    }

    pub fn set(&mut self, place: PlaceId, tokens: Weight) {
        self.0.insert(place, tokens);
    }

    pub fn contains(&self, place: PlaceId) -> bool {
        self.0.contains_key(&place)
    }

    pub(crate) fn remove(&mut self, place: PlaceId) -> Option<Weight> {
        self.0.shift_remove(&place)
    }

    pub fn total(&self) -> Weight {
        self.0.values().sum()
    }
}

impl PartialEq for Marking {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl Eq for Marking {}

impl Hash for Marking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (place, tokens) in self.0.iter() {
            place.hash(state);
            tokens.hash(state);
        }
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl FromIterator<(PlaceId, Weight)> for Marking {
    fn from_iter<I: IntoIterator<Item = (PlaceId, Weight)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
