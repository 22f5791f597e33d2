//! I/O 支持：规范快照结构以及 JSON、RON 序列化接口。
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::config::NetConfig;
use crate::net::error::NetError;
use crate::net::ids::{ArcId, EntityRef, NodeRef, PlaceId, TransitionId};
use crate::net::model::Net;
use crate::net::structure::{
    ArcKind, ArcSpec, PlaceSpec, TransitionKind, TransitionSpec, Weight, DEFAULT_DELAY_MEAN,
    DEFAULT_PRIORITY, DEFAULT_TOKEN_COLOR,
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed net: {0}")]
    Net(#[from] NetError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub id: PlaceId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tokens: Weight,
    #[serde(default)]
    pub capacity: Option<Weight>,
    #[serde(default = "default_token_color")]
    pub token_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub id: TransitionId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub kind: TransitionKind,
    #[serde(default = "default_delay_mean")]
    pub delay_mean: f64,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcRecord {
    pub id: ArcId,
    pub source_id: NodeRef,
    pub target_id: NodeRef,
    #[serde(default = "default_weight")]
    pub weight: Weight,
    #[serde(default)]
    pub kind: ArcKind,
}

/// 规范快照：持久化协作方加载/保存的结构。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetSnapshot {
    pub places: Vec<PlaceRecord>,
    pub transitions: Vec<TransitionRecord>,
    pub arcs: Vec<ArcRecord>,
    #[serde(default)]
    pub marking: IndexMap<PlaceId, Weight>,
}

impl Net {
    pub fn to_snapshot(&self) -> NetSnapshot {
        NetSnapshot {
            places: self
                .places()
                .map(|place| PlaceRecord {
                    id: place.id,
                    label: place.label.clone(),
                    tokens: self.marking.tokens(place.id),
                    capacity: place.capacity,
                    token_color: place.token_color.clone(),
                })
                .collect(),
            transitions: self
                .transitions()
                .map(|transition| TransitionRecord {
                    id: transition.id,
                    label: transition.label.clone(),
                    kind: transition.kind,
                    delay_mean: transition.delay_mean,
                    priority: transition.priority,
                })
                .collect(),
            arcs: self
                .arcs()
                .map(|arc| ArcRecord {
                    id: arc.id,
                    source_id: arc.source,
                    target_id: arc.target,
                    weight: arc.weight,
                    kind: arc.kind,
                })
                .collect(),
            marking: self.marking.0.clone(),
        }
    }

    /// 从快照重建网。所有记录都经过与编辑命令相同的校验，坏记录直接报错而不是被丢弃。
    ///
    /// The `marking` map wins over a place record's `tokens` when both are present.
    pub fn from_snapshot(snapshot: NetSnapshot, config: NetConfig) -> Result<Net, NetError> {
        let mut net = Net::with_config(config);
        for record in snapshot.places {
            let tokens = snapshot
                .marking
                .get(&record.id)
                .copied()
                .unwrap_or(record.tokens);
            let spec = PlaceSpec {
                label: record.label,
                tokens,
                capacity: record.capacity,
                token_color: record.token_color,
            };
            net.insert_place(record.id, spec)?;
        }
        if let Some(stray) = snapshot.marking.keys().find(|place| net.place(**place).is_err()) {
            return Err(NetError::UnknownEntity(EntityRef::Place(*stray)));
        }
        for record in snapshot.transitions {
            let spec = TransitionSpec {
                label: record.label,
                kind: record.kind,
                delay_mean: record.delay_mean,
                priority: record.priority,
            };
            net.insert_transition(record.id, spec)?;
        }
        for record in snapshot.arcs {
            let spec = ArcSpec {
                source: record.source_id,
                target: record.target_id,
                weight: record.weight,
                kind: record.kind,
            };
            net.insert_arc(record.id, spec)?;
        }
        log::debug!(
            "loaded net with {} places, {} transitions, {} arcs",
            net.places_len(),
            net.transitions_len(),
            net.arcs_len()
        );
        Ok(net)
    }
}

fn default_token_color() -> String {
    DEFAULT_TOKEN_COLOR.to_string()
}

fn default_delay_mean() -> f64 {
    DEFAULT_DELAY_MEAN
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn default_weight() -> Weight {
    1
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_json_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_json_str(&content)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_ron_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_ron<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_ron_str(&content)
}

/// Loads a net from a `.json` or `.ron` snapshot file.
pub fn load_net<P: AsRef<Path>>(path: P, config: NetConfig) -> Result<Net, IoError> {
    let path = path.as_ref();
    let snapshot: NetSnapshot = match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => read_ron(path)?,
        _ => read_json(path)?,
    };
    Ok(Net::from_snapshot(snapshot, config)?)
}

pub fn save_net<P: AsRef<Path>>(path: P, net: &Net) -> Result<(), IoError> {
    let path = path.as_ref();
    let snapshot = net.to_snapshot();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => write_ron(path, &snapshot),
        _ => write_json(path, &snapshot),
    }
}
