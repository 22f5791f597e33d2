//! 库所、迁移与弧的强类型标识符。
//!
//! 标识符以 `p<n>` / `t<n>` / `a<n>` 的形式展示与序列化，便于在 JSON 标识映射中作为键。
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} id `{raw}`")]
pub struct ParseIdError {
    pub kind: &'static str,
    pub raw: String,
}

macro_rules! define_id {
    ($name:ident, $prefix:literal, $kind:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const PREFIX: char = $prefix;

            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix($prefix)
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .map(Self)
                    .ok_or_else(|| ParseIdError {
                        kind: $kind,
                        raw: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_id!(PlaceId, 'p', "place");
define_id!(TransitionId, 't', "transition");
define_id!(ArcId, 'a', "arc");

/// Endpoint of an arc: either side of the bipartite net.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Place(PlaceId),
    Transition(TransitionId),
}

impl NodeRef {
    pub fn as_place(self) -> Option<PlaceId> {
        match self {
            NodeRef::Place(place) => Some(place),
            NodeRef::Transition(_) => None,
        }
    }

    pub fn as_transition(self) -> Option<TransitionId> {
        match self {
            NodeRef::Place(_) => None,
            NodeRef::Transition(transition) => Some(transition),
        }
    }
}

impl From<PlaceId> for NodeRef {
    fn from(value: PlaceId) -> Self {
        NodeRef::Place(value)
    }
}

impl From<TransitionId> for NodeRef {
    fn from(value: TransitionId) -> Self {
        NodeRef::Transition(value)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Place(place) => place.fmt(f),
            NodeRef::Transition(transition) => transition.fmt(f),
        }
    }
}

impl FromStr for NodeRef {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.chars().next() {
            Some(PlaceId::PREFIX) => s.parse().map(NodeRef::Place),
            Some(TransitionId::PREFIX) => s.parse().map(NodeRef::Transition),
            _ => Err(ParseIdError {
                kind: "node",
                raw: s.to_string(),
            }),
        }
    }
}

impl Serialize for NodeRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Any entity a net owns, used when reporting unknown ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Place(PlaceId),
    Transition(TransitionId),
    Arc(ArcId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Place(id) => write!(f, "place {id}"),
            EntityRef::Transition(id) => write!(f, "transition {id}"),
            EntityRef::Arc(id) => write!(f, "arc {id}"),
        }
    }
}

impl From<NodeRef> for EntityRef {
    fn from(value: NodeRef) -> Self {
        match value {
            NodeRef::Place(place) => EntityRef::Place(place),
            NodeRef::Transition(transition) => EntityRef::Transition(transition),
        }
    }
}
