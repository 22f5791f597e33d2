//! 只读诊断：死锁、并发度与有界性，以及连通性检查。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::model::Net;
use crate::net::structure::Weight;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The net has transitions but none is enabled.
    pub deadlock: bool,
    /// Number of simultaneously enabled transitions.
    pub concurrent: usize,
    pub bounded: bool,
    pub unbounded_places: Vec<PlaceId>,
    /// Enabled transitions in firing order.
    pub enabled: Vec<TransitionId>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "deadlock:   {}", self.deadlock)?;
        writeln!(f, "concurrent: {}", self.concurrent)?;
        write!(f, "bounded:    {}", self.bounded)?;
        if !self.unbounded_places.is_empty() {
            write!(f, " (over limit: {:?})", self.unbounded_places)?;
        }
        Ok(())
    }
}

/// 连通性诊断报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    /// 孤立库所（无任何连接的弧）
    pub isolated_places: Vec<PlaceId>,
    /// 孤立迁移
    pub isolated_transitions: Vec<TransitionId>,
    /// 无前置库所的迁移：只要容量允许就永远可发生
    pub source_transitions: Vec<TransitionId>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.source_transitions.is_empty()
    }
}

impl Net {
    pub fn validate(&self) -> ValidationReport {
        let enabled = self.enabled_transitions();
        let unbounded_places = self.unbounded_places();
        ValidationReport {
            deadlock: self.transitions_len() > 0 && enabled.is_empty(),
            concurrent: enabled.len(),
            bounded: unbounded_places.is_empty(),
            unbounded_places,
            enabled,
        }
    }

    /// Places over their capacity, or, when uncapacitated, at or above the
    /// configured heuristic ceiling.
    fn unbounded_places(&self) -> Vec<PlaceId> {
        let threshold = self.config.unbounded_threshold;
        self.places
            .values()
            .filter(|place| {
                let tokens = self.marking.tokens(place.id);
                match place.capacity {
                    Some(capacity) => tokens > capacity,
                    None => tokens >= threshold,
                }
            })
            .map(|place| place.id)
            .collect()
    }

    pub fn unbounded_threshold(&self) -> Weight {
        self.config.unbounded_threshold
    }

    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let isolated_places = self
            .places
            .keys()
            .filter(|place| self.arcs_of((**place).into()).next().is_none())
            .copied()
            .collect();

        let mut isolated_transitions = Vec::new();
        let mut source_transitions = Vec::new();
        for id in self.transitions.keys() {
            if self.arcs_of((*id).into()).next().is_none() {
                isolated_transitions.push(*id);
            } else if self.input_arcs(*id).next().is_none() {
                source_transitions.push(*id);
            }
        }

        DiagnosticReport {
            isolated_places,
            isolated_transitions,
            source_transitions,
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
        }
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();
        if !report.has_issues() {
            log::info!(
                "connectivity check passed ({} places, {} transitions)",
                report.total_places,
                report.total_transitions
            );
            return;
        }
        for place in &report.isolated_places {
            log::warn!("place {} has no arcs", place);
        }
        for transition in &report.isolated_transitions {
            log::warn!("transition {} has no arcs", transition);
        }
        for transition in &report.source_transitions {
            log::warn!(
                "transition {} has no input arcs and is always enabled unless blocked by capacity",
                transition
            );
        }
    }
}
