use std::collections::VecDeque;

use crate::net::error::NetError;
use crate::net::ids::TransitionId;
use crate::net::model::Net;
use crate::net::structure::Marking;
use crate::sim::clock::SimTime;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub time: SimTime,
    pub transition: TransitionId,
    /// Marking before the firing.
    pub previous: Marking,
    /// Marking after the firing.
    pub marking: Marking,
}

/// Bounded log of scheduler firings; the oldest entry is dropped first.
#[derive(Debug, Clone, Default)]
pub struct MarkingHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl MarkingHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rolls `net` back over the newest firing. The entry stays recorded if the
    /// marking no longer fits the net (places were added or removed since).
    pub fn undo(&mut self, net: &mut Net) -> Result<Option<HistoryEntry>, NetError> {
        let Some(entry) = self.entries.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = net.restore_marking(entry.previous.clone()) {
            self.entries.push_back(entry);
            return Err(err);
        }
        log::debug!("undid {} fired at {}", entry.transition, entry.time);
        Ok(Some(entry))
    }
}
