//! 执行引擎端到端场景：可发生判定、发生规则、诊断、快照往返与调度。

use pnsim::analysis::explore;
use pnsim::config::{NetConfig, SimulationConfig};
use pnsim::net::io::{from_json_str, from_ron_str, to_json_string, to_ron_string};
use pnsim::net::*;
use pnsim::sim::{Scheduler, SelectionPolicy, SimEvent};

/// A(2, cap 5) --2--> T1 --1--> B(0)
fn scenario_a() -> (Net, PlaceId, TransitionId, PlaceId) {
    let mut net = Net::empty();
    let a = net
        .add_place(PlaceSpec::new("A").with_tokens(2).with_capacity(5))
        .unwrap()
        .id;
    let b = net.add_place(PlaceSpec::new("B")).unwrap().id;
    let t1 = net.add_transition(TransitionSpec::new("T1")).unwrap().id;
    net.add_arc(ArcSpec::new(a, t1).with_weight(2)).unwrap();
    net.add_arc(ArcSpec::new(t1, b)).unwrap();
    (net, a, t1, b)
}

#[test]
fn scenario_a_normal_arcs() {
    let (mut net, a, t1, b) = scenario_a();
    assert!(net.is_enabled(t1).unwrap());
    net.fire(t1).unwrap();
    assert_eq!(net.tokens(a).unwrap(), 0);
    assert_eq!(net.tokens(b).unwrap(), 1);
}

#[test]
fn scenario_b_inhibitor_arc() {
    let mut net = Net::empty();
    let a = net.add_place(PlaceSpec::new("A").with_tokens(1)).unwrap().id;
    let t1 = net.add_transition(TransitionSpec::new("T1")).unwrap().id;
    net.add_arc(ArcSpec::inhibitor(a, t1)).unwrap();

    assert!(!net.is_enabled(t1).unwrap());
    net.set_tokens(a, 0).unwrap();
    assert!(net.is_enabled(t1).unwrap());
}

#[test]
fn scenario_c_reset_arc() {
    let mut net = Net::empty();
    let a = net.add_place(PlaceSpec::new("A").with_tokens(5)).unwrap().id;
    let t1 = net.add_transition(TransitionSpec::new("T1")).unwrap().id;
    net.add_arc(ArcSpec::reset(a, t1)).unwrap();

    net.fire(t1).unwrap();
    assert_eq!(net.tokens(a).unwrap(), 0);
}

#[test]
fn scenario_d_capacity_blocks_enabling() {
    let mut net = Net::empty();
    let b = net
        .add_place(PlaceSpec::new("B").with_tokens(2).with_capacity(2))
        .unwrap()
        .id;
    let t1 = net.add_transition(TransitionSpec::new("T1")).unwrap().id;
    net.add_arc(ArcSpec::new(t1, b)).unwrap();

    assert!(!net.is_enabled(t1).unwrap());
    assert!(matches!(
        net.blockers(t1).unwrap().as_slice(),
        [Blocker::WouldExceedCapacity { capacity: 2, .. }]
    ));
}

#[test]
fn scenario_e_deadlock() {
    let (mut net, _, t1, _) = scenario_a();
    net.fire(t1).unwrap();
    let report = net.validate();
    assert!(report.deadlock);
    assert_eq!(report.concurrent, 0);
}

#[test]
fn reset_overrides_weight() {
    for weight in [1, 3, 10] {
        for tokens in [0, 1, 2, 7, 20] {
            let mut net = Net::empty();
            let a = net
                .add_place(PlaceSpec::new("A").with_tokens(tokens))
                .unwrap()
                .id;
            let t = net.add_transition(TransitionSpec::new("T")).unwrap().id;
            net.add_arc(ArcSpec::reset(a, t).with_weight(weight)).unwrap();
            net.fire(t).unwrap();
            assert_eq!(net.tokens(a).unwrap(), 0);
        }
    }
}

#[test]
fn failed_fire_leaves_marking_unchanged() {
    let (mut net, a, t1, _) = scenario_a();
    net.set_tokens(a, 1).unwrap();
    let before = net.marking().clone();

    let err = net.fire(t1).unwrap_err();
    assert!(matches!(err, FireError::NotEnabled { transition, .. } if transition == t1));
    assert_eq!(net.marking(), &before);

    let ghost = TransitionId::new(99);
    assert_eq!(net.fire(ghost), Err(FireError::UnknownTransition(ghost)));
    assert_eq!(net.marking(), &before);
}

#[test]
fn conservation_over_normal_arcs() {
    let mut net = Net::empty();
    let p = net.add_place(PlaceSpec::new("p").with_tokens(6)).unwrap().id;
    let q = net.add_place(PlaceSpec::new("q").with_tokens(1)).unwrap().id;
    let r = net.add_place(PlaceSpec::new("r")).unwrap().id;
    let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
    net.add_arc(ArcSpec::new(p, t).with_weight(2)).unwrap();
    net.add_arc(ArcSpec::new(q, t)).unwrap();
    net.add_arc(ArcSpec::new(t, r).with_weight(3)).unwrap();
    net.add_arc(ArcSpec::new(t, q).with_weight(2)).unwrap();

    let outcome = net.fire(t).unwrap();
    assert_eq!(net.tokens(p).unwrap(), 6 - 2);
    assert_eq!(net.tokens(q).unwrap(), 1 - 1 + 2);
    assert_eq!(net.tokens(r).unwrap(), 3);
    assert!(outcome.clamped.is_empty());
    let delta: i64 = outcome.changes.iter().map(TokenChange::delta).sum();
    assert_eq!(delta, -2 - 1 + 3 + 2);
}

#[test]
fn combined_outputs_are_clamped_and_reported() {
    let mut net = Net::empty();
    let p = net
        .add_place(PlaceSpec::new("p").with_capacity(2))
        .unwrap()
        .id;
    let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
    net.add_arc(ArcSpec::new(t, p).with_weight(2)).unwrap();
    net.add_arc(ArcSpec::new(t, p).with_weight(2)).unwrap();

    assert!(net.is_enabled(t).unwrap());
    let outcome = net.fire(t).unwrap();
    assert_eq!(net.tokens(p).unwrap(), 2);
    assert_eq!(
        outcome.clamped,
        vec![CapacityExceeded {
            place: p,
            attempted: 4,
            capacity: 2
        }]
    );
    assert!(net.validate().bounded);
}

/// Every combination of one normal input, one inhibitor and one capacitated
/// output around a single transition, checked against the enabling rule.
#[test]
fn exhaustive_enabling_soundness() {
    for in_tokens in 0..=3u64 {
        for in_weight in 1..=2u64 {
            for inh_tokens in 0..=3u64 {
                for inh_weight in 1..=2u64 {
                    for out_tokens in 0..=3u64 {
                        for out_weight in 1..=2u64 {
                            for capacity in [None, Some(1u64), Some(3)] {
                                if capacity.is_some_and(|k| out_tokens > k) {
                                    continue;
                                }
                                check_single_transition(
                                    (in_tokens, in_weight),
                                    (inh_tokens, inh_weight),
                                    (out_tokens, out_weight),
                                    capacity,
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

fn check_single_transition(
    (in_tokens, in_weight): (Weight, Weight),
    (inh_tokens, inh_weight): (Weight, Weight),
    (out_tokens, out_weight): (Weight, Weight),
    capacity: Option<Weight>,
) {
    let mut net = Net::empty();
    let input = net
        .add_place(PlaceSpec::new("in").with_tokens(in_tokens))
        .unwrap()
        .id;
    let guard = net
        .add_place(PlaceSpec::new("guard").with_tokens(inh_tokens))
        .unwrap()
        .id;
    let mut out_spec = PlaceSpec::new("out").with_tokens(out_tokens);
    if let Some(k) = capacity {
        out_spec = out_spec.with_capacity(k);
    }
    let output = net.add_place(out_spec).unwrap().id;
    let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;
    net.add_arc(ArcSpec::new(input, t).with_weight(in_weight))
        .unwrap();
    net.add_arc(ArcSpec::inhibitor(guard, t).with_weight(inh_weight))
        .unwrap();
    net.add_arc(ArcSpec::new(t, output).with_weight(out_weight))
        .unwrap();

    let expected = in_tokens >= in_weight
        && inh_tokens < inh_weight
        && capacity.is_none_or(|k| out_tokens + out_weight <= k);
    let case = format!(
        "in {in_tokens}/{in_weight}, inh {inh_tokens}/{inh_weight}, out {out_tokens}+{out_weight} cap {capacity:?}"
    );
    assert_eq!(net.is_enabled(t).unwrap(), expected, "{case}");
    assert_eq!(net.blockers(t).unwrap().is_empty(), expected, "{case}");
    assert_eq!(net.enabled_transitions().contains(&t), expected, "{case}");

    let before = net.marking().clone();
    match net.fire(t) {
        Ok(outcome) => {
            assert!(expected, "{case}");
            assert!(outcome.clamped.is_empty(), "{case}");
            assert_eq!(net.tokens(input).unwrap(), in_tokens - in_weight, "{case}");
            assert_eq!(net.tokens(guard).unwrap(), inh_tokens, "{case}");
            assert_eq!(net.tokens(output).unwrap(), out_tokens + out_weight, "{case}");
        }
        Err(_) => {
            assert!(!expected, "{case}");
            assert_eq!(net.marking(), &before, "{case}");
        }
    }
}

#[test]
fn enabled_order_is_priority_then_insertion() {
    let mut net = Net::empty();
    let p = net.add_place(PlaceSpec::new("p").with_tokens(1)).unwrap().id;
    let mut ids = Vec::new();
    for (label, priority) in [("a", 1), ("b", 3), ("c", 1), ("d", 3)] {
        let t = net
            .add_transition(TransitionSpec::new(label).with_priority(priority))
            .unwrap()
            .id;
        net.add_arc(ArcSpec::new(p, t)).unwrap();
        ids.push(t);
    }
    let expected = vec![ids[1], ids[3], ids[0], ids[2]];
    for _ in 0..5 {
        assert_eq!(net.enabled_transitions(), expected);
    }
}

#[test]
fn invalid_arcs_are_rejected_without_change() {
    let mut net = Net::empty();
    let p = net.add_place(PlaceSpec::new("p")).unwrap().id;
    let q = net.add_place(PlaceSpec::new("q")).unwrap().id;
    let t = net.add_transition(TransitionSpec::new("t")).unwrap().id;

    assert!(matches!(
        net.add_arc(ArcSpec::new(p, q)),
        Err(NetError::InvalidArc(ArcViolation::SameSide { .. }))
    ));
    assert!(matches!(
        net.add_arc(ArcSpec::new(t, p).with_kind(ArcKind::Inhibitor)),
        Err(NetError::InvalidArc(ArcViolation::WrongDirection { .. }))
    ));
    assert!(matches!(
        net.add_arc(ArcSpec::new(p, t).with_weight(0)),
        Err(NetError::InvalidArc(ArcViolation::ZeroWeight))
    ));
    assert!(matches!(
        net.add_arc(ArcSpec::new(p, TransitionId::new(7))),
        Err(NetError::UnknownEntity(_))
    ));
    assert_eq!(net.arcs_len(), 0);
}

#[test]
fn removing_a_place_cascades() {
    let (mut net, a, t1, b) = scenario_a();
    net.remove_place(a).unwrap();
    assert_eq!(net.arcs_len(), 1);
    assert!(!net.marking().contains(a));
    assert!(net.is_enabled(t1).unwrap());
    net.remove_transition(t1).unwrap();
    assert_eq!(net.arcs_len(), 0);
    assert_eq!(net.tokens(b).unwrap(), 0);
}

fn mixed_net() -> Net {
    let mut net = Net::empty();
    let a = net
        .add_place(PlaceSpec::new("A").with_tokens(3).with_capacity(5))
        .unwrap()
        .id;
    let b = net
        .add_place(PlaceSpec::new("B").with_token_color("#ff8800"))
        .unwrap()
        .id;
    let c = net.add_place(PlaceSpec::new("C").with_tokens(1)).unwrap().id;
    let t1 = net
        .add_transition(TransitionSpec::timed("T1", 2.5).with_priority(4))
        .unwrap()
        .id;
    let t2 = net.add_transition(TransitionSpec::new("T2")).unwrap().id;
    net.add_arc(ArcSpec::new(a, t1).with_weight(2)).unwrap();
    net.add_arc(ArcSpec::new(t1, b)).unwrap();
    net.add_arc(ArcSpec::inhibitor(b, t2).with_weight(2)).unwrap();
    net.add_arc(ArcSpec::reset(c, t2)).unwrap();
    net.add_arc(ArcSpec::new(t2, a)).unwrap();
    net
}

#[test]
fn snapshot_round_trip_json_and_ron() {
    let net = mixed_net();
    let snapshot = net.to_snapshot();

    let json = to_json_string(&snapshot).unwrap();
    let from_json = Net::from_snapshot(from_json_str(&json).unwrap(), NetConfig::default()).unwrap();
    assert_eq!(from_json.to_snapshot(), snapshot);
    assert_eq!(from_json.marking(), net.marking());

    let ron = to_ron_string(&snapshot).unwrap();
    let from_ron = Net::from_snapshot(from_ron_str(&ron).unwrap(), NetConfig::default()).unwrap();
    assert_eq!(from_ron.to_snapshot(), snapshot);
    assert_eq!(from_ron.enabled_transitions(), net.enabled_transitions());
}

#[test]
fn malformed_snapshot_is_rejected() {
    let json = r#"{
        "places": [{"id": "p0", "label": "A"}, {"id": "p1", "label": "B"}],
        "transitions": [],
        "arcs": [{"id": "a0", "sourceId": "p0", "targetId": "p1"}],
        "marking": {"p0": 1}
    }"#;
    let snapshot: NetSnapshot = from_json_str(json).unwrap();
    assert!(matches!(
        Net::from_snapshot(snapshot, NetConfig::default()),
        Err(NetError::InvalidArc(ArcViolation::SameSide { .. }))
    ));
}

#[test]
fn shared_net_fires_atomically_across_threads() {
    let mut net = Net::empty();
    let pool = net.add_place(PlaceSpec::new("pool").with_tokens(100)).unwrap().id;
    let done = net.add_place(PlaceSpec::new("done")).unwrap().id;
    let take = net.add_transition(TransitionSpec::new("take")).unwrap().id;
    net.add_arc(ArcSpec::new(pool, take)).unwrap();
    net.add_arc(ArcSpec::new(take, done)).unwrap();
    let shared = SharedNet::new(net);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let mut fired = 0;
                while shared.fire(take).is_ok() {
                    fired += 1;
                }
                fired
            })
        })
        .collect();
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 100);
    shared.with(|net| {
        assert_eq!(net.tokens(pool).unwrap(), 0);
        assert_eq!(net.tokens(done).unwrap(), 100);
    });
    assert!(shared.validate().deadlock);
}

#[test]
fn reachability_finds_dead_marking_of_mixed_net() {
    let net = mixed_net();
    let report = explore(&net, 1000);
    assert!(!report.stats.truncated);
    assert!(report.stats.state_count > 1);
    for dead in &report.dead_markings {
        let mut replay = net.clone();
        for t in &dead.witness {
            replay.fire(*t).unwrap();
        }
        assert_eq!(replay.marking(), &dead.marking);
        assert!(replay.validate().deadlock);
    }
}

#[test]
fn seeded_run_is_reproducible_and_records_history() {
    let run = |seed| {
        let mut net = mixed_net();
        let mut scheduler = Scheduler::new(SimulationConfig {
            seed: Some(seed),
            policy: SelectionPolicy::UniformRandomAmongEnabled,
            ..SimulationConfig::default()
        });
        let events = scheduler.run(&mut net, 50);
        let fired: Vec<_> = events.iter().filter_map(SimEvent::fired).collect();
        assert_eq!(scheduler.history().len(), fired.len());
        (fired, net.marking().clone(), scheduler.now())
    };
    assert_eq!(run(2024), run(2024));
}
