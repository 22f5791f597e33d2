use crate::net::dot::escape_label;
use crate::net::firing::TokenChange;
use crate::net::ids::TransitionId;
use crate::net::model::Net;
use crate::net::structure::Marking;
use itertools::Itertools;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::{EdgeReference, StableGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::path::Path;

/// marking 保留完整标识,enabled 按发生顺序排列.
#[derive(Debug, Clone)]
pub struct StateNode {
    pub index: usize,
    pub marking: Marking,
    pub enabled: Vec<TransitionId>,
}

#[derive(Debug, Clone)]
pub struct StateEdge {
    pub transition: TransitionId,
    pub changes: Vec<TokenChange>,
    /// Some output was clamped at a place capacity.
    pub clamped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadMarking {
    pub state: usize,
    pub marking: Marking,
    /// Shortest firing sequence from the initial marking.
    pub witness: Vec<TransitionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateGraphStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReachabilityReport {
    pub stats: StateGraphStats,
    pub dead_markings: Vec<DeadMarking>,
}

impl fmt::Display for ReachabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} states, {} edges, {} dead",
            self.stats.state_count, self.stats.edge_count, self.stats.deadlock_count
        )?;
        if self.stats.truncated {
            write!(f, " (truncated)")?;
        }
        for dead in &self.dead_markings {
            write!(
                f,
                "\n  s{} {} via [{}]",
                dead.state,
                format_marking(&dead.marking),
                dead.witness.iter().join(", ")
            )?;
        }
        Ok(())
    }
}

/// 从当前标识出发的有限可达图（广度优先）。
#[derive(Debug)]
pub struct StateGraph {
    pub graph: StableGraph<StateNode, StateEdge>,
    pub initial: NodeIndex,
    /// Dead states in discovery order.
    pub deadlocks: Vec<NodeIndex>,
    pub truncated: bool,
    pub markings: HashMap<Marking, NodeIndex>,
    parents: HashMap<NodeIndex, (NodeIndex, TransitionId)>,
}

impl StateGraph {
    /// Explores at most `state_limit` distinct markings. The net is not touched.
    pub fn explore(net: &Net, state_limit: usize) -> Self {
        let state_limit = state_limit.max(1);
        let mut graph = StableGraph::new();
        let mut markings: HashMap<Marking, NodeIndex> = HashMap::new();
        let mut parents = HashMap::new();
        let mut queue = VecDeque::new();
        let mut deadlocks = Vec::new();
        let mut truncated = false;
        let has_transitions = net.transitions_len() > 0;

        let initial_marking = net.marking().clone();
        let initial = graph.add_node(StateNode {
            index: 0,
            marking: initial_marking.clone(),
            enabled: Vec::new(),
        });
        markings.insert(initial_marking, initial);
        queue.push_back(initial);

        while let Some(state) = queue.pop_front() {
            let current = graph[state].marking.clone();
            let enabled = net.enabled_under(&current);
            graph[state].enabled = enabled.clone();

            if enabled.is_empty() {
                if has_transitions {
                    deadlocks.push(state);
                }
                continue;
            }

            for transition in enabled {
                let (next, clamped) = match net.fire_under(&current, transition) {
                    Ok(result) => result,
                    Err(err) => {
                        log::warn!("state s{}: {}", graph[state].index, err);
                        continue;
                    }
                };
                let target = match markings.entry(next.clone()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if graph.node_count() >= state_limit {
                            truncated = true;
                            continue;
                        }
                        let index = graph.add_node(StateNode {
                            index: graph.node_count(),
                            marking: next.clone(),
                            enabled: Vec::new(),
                        });
                        entry.insert(index);
                        parents.insert(index, (state, transition));
                        queue.push_back(index);
                        index
                    }
                };
                let edge = StateEdge {
                    transition,
                    changes: diff(&current, &next),
                    clamped: !clamped.is_empty(),
                };
                graph.add_edge(state, target, edge);
            }
        }

        if truncated {
            log::info!("state space truncated at {} states", state_limit);
        }

        Self {
            graph,
            initial,
            deadlocks,
            truncated,
            markings,
            parents,
        }
    }

    pub fn stats(&self) -> StateGraphStats {
        StateGraphStats {
            state_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            deadlock_count: self.deadlocks.len(),
            truncated: self.truncated,
        }
    }

    pub fn node(&self, index: NodeIndex) -> &StateNode {
        &self.graph[index]
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    /// Firing sequence that leads from the initial marking to `state`.
    pub fn witness(&self, state: NodeIndex) -> Vec<TransitionId> {
        let mut path = Vec::new();
        let mut cursor = state;
        while let Some(&(parent, transition)) = self.parents.get(&cursor) {
            path.push(transition);
            cursor = parent;
        }
        path.reverse();
        path
    }

    pub fn report(&self) -> ReachabilityReport {
        let dead_markings = self
            .deadlocks
            .iter()
            .map(|&state| DeadMarking {
                state: self.graph[state].index,
                marking: self.graph[state].marking.clone(),
                witness: self.witness(state),
            })
            .collect();
        ReachabilityReport {
            stats: self.stats(),
            dead_markings,
        }
    }

    pub fn dot(&self, net: &Net) -> String {
        let edge_attr = |_, edge: EdgeReference<StateEdge>| -> String {
            let transition = edge.weight().transition;
            let label = net
                .transition(transition)
                .map(|t| t.label.clone())
                .unwrap_or_else(|_| transition.to_string());
            let style = if edge.weight().clamped {
                ", style=dashed"
            } else {
                ""
            };
            format!("label=\"{}\"{}", escape_label(&label), style)
        };
        let node_attr = |_, (index, node): (NodeIndex, &StateNode)| -> String {
            let mut label = format!(
                "s{}\\n{}",
                node.index,
                escape_label(&format_marking(&node.marking))
            );
            if !node.enabled.is_empty() {
                let enabled = node.enabled.iter().join(", ");
                label.push_str(&format!("\\nenabled: {}", escape_label(&enabled)));
            }
            let shape = if self.deadlocks.contains(&index) {
                ", shape=doublecircle"
            } else {
                ""
            };
            format!("label=\"{}\"{}", label, shape)
        };

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &edge_attr,
                &node_attr
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, net: &Net, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.dot(net))
    }
}

/// Bounded reachability summary from the net's current marking.
pub fn explore(net: &Net, state_limit: usize) -> ReachabilityReport {
    StateGraph::explore(net, state_limit).report()
}

fn diff(before: &Marking, after: &Marking) -> Vec<TokenChange> {
    before
        .iter()
        .filter_map(|(place, tokens)| {
            let next = after.tokens(place);
            (tokens != next).then_some(TokenChange {
                place,
                before: tokens,
                after: next,
            })
        })
        .collect()
}

fn format_marking(marking: &Marking) -> String {
    let marked = marking
        .iter()
        .filter(|(_, tokens)| *tokens > 0)
        .map(|(place, tokens)| format!("{}:{}", place, tokens))
        .join(", ");
    format!("[{}]", marked)
}
