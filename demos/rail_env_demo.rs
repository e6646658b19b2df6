// Demonstration: run the rail environment with a baseline policy.
//
// Run from the repo root:
//   RUST_LOG=railcast=debug cargo run --example rail_env_demo -- --policy shortest --episodes 5

use std::env;
use std::error::Error;

use railcast::{
    AgentStatus, AgentStore, Cell, Direction, EnvConfig, LayoutBuilder, MalfunctionConfig, Policy,
    RailEnvironment, RailLayout, RandomPolicy, ShortestPathPolicy, TrackGraph,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let policy_name = arg_value(&args, "--policy").unwrap_or("shortest");
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    let config = EnvConfig {
        max_steps: 60,
        malfunction: MalfunctionConfig {
            rate: 0.02,
            ..Default::default()
        },
        ..Default::default()
    };

    let graph = TrackGraph::build(&passing_loop()?)?;
    let mut agents = AgentStore::new();
    agents.add(Cell::new(1, 0), Direction::East, Cell::new(1, 6), 1.0)?;
    agents.add(Cell::new(1, 6), Direction::West, Cell::new(1, 0), 1.0)?;
    agents.add(Cell::new(1, 0), Direction::East, Cell::new(0, 3), 0.5)?;

    let mut policy: Box<dyn Policy> = match policy_name {
        "random" => Box::new(RandomPolicy::new(seed)),
        "shortest" => Box::new(ShortestPathPolicy::new(&config.observer)),
        other => {
            eprintln!("Unknown --policy '{}'; expected 'shortest' or 'random'.", other);
            std::process::exit(2);
        }
    };

    let mut env = RailEnvironment::new(graph, agents, config, seed)?;
    println!("Policy: {}", policy.name());

    for episode in 0..episodes {
        let mut step = env.reset();
        let mut conflicts = 0;
        loop {
            let actions = policy.select_actions(&step);
            let result = env.step(&actions)?;
            conflicts += result.observation.report.conflicts.len();
            step = result.observation;
            if result.done {
                break;
            }
        }
        let count = |status: AgentStatus| env.agents().iter().filter(|a| a.status == status).count();
        println!(
            "episode {:>3}: steps={:>3} done={} deadlocked={} predicted_conflicts={}",
            episode,
            env.step_count(),
            count(AgentStatus::Done),
            count(AgentStatus::Deadlocked),
            conflicts
        );
    }

    Ok(())
}

/// Main line on row 1 with a passing loop over row 0.
fn passing_loop() -> Result<RailLayout, railcast::GraphError> {
    let main: Vec<Cell> = (0..7).map(|c| Cell::new(1, c)).collect();
    let mut siding = vec![Cell::new(1, 0), Cell::new(1, 1)];
    siding.extend((1..6).map(|c| Cell::new(0, c)));
    siding.extend([Cell::new(1, 5), Cell::new(1, 6)]);
    Ok(LayoutBuilder::new(2, 7).add_line(&main)?.add_line(&siding)?.build())
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
