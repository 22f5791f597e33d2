//! 同时可发生多个迁移时的选择策略。
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::TransitionId;
use crate::net::model::Net;

/// How the scheduler resolves a choice among enabled transitions.
///
/// Every policy works on the list returned by [`Net::enabled_transitions`],
/// which is already ordered by priority (descending) and insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Always the head of the ordered list.
    FirstEnabled,
    /// Uniform over the whole enabled set, ignoring priority.
    UniformRandomAmongEnabled,
    /// Uniform over the transitions sharing the highest enabled priority.
    #[default]
    UniformRandomAmongTopPriority,
}

impl SelectionPolicy {
    pub fn select<R: Rng + ?Sized>(
        self,
        net: &Net,
        enabled: &[TransitionId],
        rng: &mut R,
    ) -> Option<TransitionId> {
        let first = *enabled.first()?;
        match self {
            SelectionPolicy::FirstEnabled => Some(first),
            SelectionPolicy::UniformRandomAmongEnabled => {
                Some(enabled[rng.random_range(0..enabled.len())])
            }
            SelectionPolicy::UniformRandomAmongTopPriority => {
                let tier = top_priority_tier(net, enabled);
                Some(tier[rng.random_range(0..tier.len())])
            }
        }
    }
}

/// Leading run of `enabled` whose priority equals the first entry's.
fn top_priority_tier<'a>(net: &Net, enabled: &'a [TransitionId]) -> &'a [TransitionId] {
    let priority_of = |id: &TransitionId| net.transition(*id).map(|t| t.priority).ok();
    let top = enabled.first().and_then(priority_of);
    let len = enabled
        .iter()
        .take_while(|id| priority_of(id) == top)
        .count()
        .max(1);
    &enabled[..len.min(enabled.len())]
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionPolicy::FirstEnabled => "first",
            SelectionPolicy::UniformRandomAmongEnabled => "random",
            SelectionPolicy::UniformRandomAmongTopPriority => "top-priority",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown selection policy `{0}` (expected first, random or top-priority)")]
pub struct ParsePolicyError(String);

impl FromStr for SelectionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" | "first_enabled" => Ok(SelectionPolicy::FirstEnabled),
            "random" | "uniform_random_among_enabled" => {
                Ok(SelectionPolicy::UniformRandomAmongEnabled)
            }
            "top-priority" | "uniform_random_among_top_priority" => {
                Ok(SelectionPolicy::UniformRandomAmongTopPriority)
            }
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{ArcSpec, PlaceSpec, TransitionSpec};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    /// One marked place feeding `low` (priority 1) and `high_a`, `high_b` (priority 5).
    fn tiered_net() -> (Net, TransitionId, TransitionId, TransitionId) {
        let mut net = Net::empty();
        let p = net.add_place(PlaceSpec::new("p").with_tokens(1)).unwrap().id;
        let mut add = |label: &str, priority| {
            let t = net
                .add_transition(TransitionSpec::new(label).with_priority(priority))
                .unwrap()
                .id;
            net.add_arc(ArcSpec::new(p, t)).unwrap();
            t
        };
        let low = add("low", 1);
        let high_a = add("high_a", 5);
        let high_b = add("high_b", 5);
        (net, low, high_a, high_b)
    }

    #[test]
    fn first_enabled_picks_highest_priority_earliest() {
        let (net, _, high_a, _) = tiered_net();
        let enabled = net.enabled_transitions();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(
                SelectionPolicy::FirstEnabled.select(&net, &enabled, &mut rng),
                Some(high_a)
            );
        }
    }

    #[test]
    fn top_priority_never_picks_lower_tier() {
        let (net, low, high_a, high_b) = tiered_net();
        let enabled = net.enabled_transitions();
        let mut rng = StdRng::seed_from_u64(3);
        let picked: HashSet<_> = (0..200)
            .filter_map(|_| {
                SelectionPolicy::UniformRandomAmongTopPriority.select(&net, &enabled, &mut rng)
            })
            .collect();
        assert!(!picked.contains(&low));
        assert_eq!(picked, HashSet::from([high_a, high_b]));
    }

    #[test]
    fn random_among_enabled_reaches_every_transition() {
        let (net, low, high_a, high_b) = tiered_net();
        let enabled = net.enabled_transitions();
        let mut rng = StdRng::seed_from_u64(5);
        let picked: HashSet<_> = (0..300)
            .filter_map(|_| {
                SelectionPolicy::UniformRandomAmongEnabled.select(&net, &enabled, &mut rng)
            })
            .collect();
        assert_eq!(picked, HashSet::from([low, high_a, high_b]));
    }

    #[test]
    fn empty_set_selects_nothing() {
        let net = Net::empty();
        let mut rng = StdRng::seed_from_u64(0);
        for policy in [
            SelectionPolicy::FirstEnabled,
            SelectionPolicy::UniformRandomAmongEnabled,
            SelectionPolicy::UniformRandomAmongTopPriority,
        ] {
            assert_eq!(policy.select(&net, &[], &mut rng), None);
        }
    }

    #[test]
    fn parses_cli_and_config_spellings() {
        assert_eq!("first".parse::<SelectionPolicy>(), Ok(SelectionPolicy::FirstEnabled));
        assert_eq!(
            "uniform_random_among_enabled".parse::<SelectionPolicy>(),
            Ok(SelectionPolicy::UniformRandomAmongEnabled)
        );
        assert_eq!(
            "top-priority".parse::<SelectionPolicy>(),
            Ok(SelectionPolicy::UniformRandomAmongTopPriority)
        );
        assert!("fastest".parse::<SelectionPolicy>().is_err());
    }
}
