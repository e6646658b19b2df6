//! JSON round trips of configs and per-step outputs.
#![cfg(feature = "serde")]

use railcast::graph::straight_line;
use railcast::observation::GraphObservation;
use railcast::{
    AgentStatus, AgentStore, Cell, ConflictReport, Direction, EnvConfig, ObserverConfig,
    RailObserver, Representation, StepObservation, TrackGraph,
};

fn head_on_step(config: ObserverConfig) -> StepObservation {
    let graph = TrackGraph::build(&straight_line(6).unwrap()).unwrap();
    let mut store = AgentStore::new();
    for (cell, heading, target) in [
        (Cell::new(0, 1), Direction::East, Cell::new(0, 5)),
        (Cell::new(0, 4), Direction::West, Cell::new(0, 0)),
    ] {
        let h = store.add(cell, heading, target, 1.0).unwrap();
        store.set_status(h, AgentStatus::Active).unwrap();
    }
    RailObserver::new(config).unwrap().observe(&graph, &store.snapshot(0))
}

#[test]
fn env_config_round_trips() {
    let config = EnvConfig {
        max_steps: 77,
        observer: ObserverConfig {
            representation: Representation::Graph,
            padding_value: -3.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"graph\""));
    let back: EnvConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn conflict_report_round_trips() {
    let step = head_on_step(ObserverConfig::default());
    assert!(!step.report.conflicts.is_empty());
    let json = serde_json::to_string(&step.report).unwrap();
    let back: ConflictReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, step.report);
}

#[test]
fn step_observation_keeps_its_shape() {
    for representation in [Representation::Vector, Representation::Graph] {
        let step = head_on_step(ObserverConfig {
            representation,
            ..Default::default()
        });
        let json = serde_json::to_string(&step).unwrap();
        let back: StepObservation = serde_json::from_str(&json).unwrap();

        assert_eq!(back.step, step.step);
        assert_eq!(back.trajectories, step.trajectories);
        assert_eq!(back.report, step.report);
        assert_eq!(back.anomalies, step.anomalies);
        for (handle, obs) in &step.observations {
            assert_eq!(back.observations[handle].len(), obs.len());
        }
    }
}

#[test]
fn graph_observation_drops_render_nodes() {
    let step = head_on_step(ObserverConfig {
        representation: Representation::Graph,
        max_nodes: 8,
        ..Default::default()
    });
    let obs = step.observations[&0].as_graph().unwrap();
    assert!(obs.node_count() > 0);
    assert_eq!(obs.nodes.len(), obs.node_count());

    let json = serde_json::to_string(obs).unwrap();
    assert!(!json.contains("\"nodes\""));
    let back: GraphObservation = serde_json::from_str(&json).unwrap();
    assert!(back.nodes.is_empty());
    assert_eq!(back.node_count(), obs.node_count());
    assert_eq!(back.node_features, obs.node_features);
    assert_eq!(back.edge_features, obs.edge_features);
    assert_eq!(back.mask, obs.mask);
}
