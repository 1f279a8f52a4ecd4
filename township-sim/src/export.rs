//! Snapshot export.
//!
//! Writes what collaborators consume after a run: the event log, the
//! causality graph, each agent's life events and the counters in
//! Prometheus text format.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use township_core::{AgentId, Event, Result, Simulation, TownError};

/// One agent's life story.
#[derive(Debug, Serialize)]
pub struct AgentLife<'a> {
    /// Who.
    pub agent: AgentId,
    /// Current full name.
    pub name: String,
    /// Still living in town.
    pub present: bool,
    /// Life events, in log order.
    pub events: Vec<&'a Event>,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| TownError::Serialization(e.to_string()))
}

/// Life stories of everyone who ever lived in town, by handle.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn lives(sim: &Simulation) -> Result<Vec<AgentLife<'_>>> {
    let town = sim.town();
    let mut ids: Vec<AgentId> = town
        .residents()
        .chain(town.deceased())
        .chain(town.departed())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter()
        .map(|id| {
            let agent = town.agent(id)?;
            Ok(AgentLife {
                agent: id,
                name: agent.full_name(),
                present: agent.present(),
                events: town.life_events(id)?,
            })
        })
        .collect()
}

/// One agent's life events as JSON.
///
/// # Errors
/// Returns an unknown-handle or serialization error.
pub fn life_events_json(sim: &Simulation, agent: AgentId) -> Result<String> {
    to_json(&sim.town().life_events(agent)?)
}

/// The causality graph as JSON.
///
/// # Errors
/// Returns `TownError::Serialization` if encoding fails.
pub fn causal_graph_json(sim: &Simulation) -> Result<String> {
    to_json(&sim.causal_graph())
}

/// The full event log as JSON.
///
/// # Errors
/// Returns `TownError::Serialization` if encoding fails.
pub fn event_log_json(sim: &Simulation) -> Result<String> {
    let events: Vec<&Event> = sim.town().events().iter().collect();
    to_json(&events)
}

/// Write every export into `dir`, creating it if needed. Returns the paths
/// written.
///
/// # Errors
/// Returns `TownError::Io` or `TownError::Serialization`.
pub fn write_snapshot(sim: &Simulation, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let files = [
        ("events.json", event_log_json(sim)?),
        ("causal_graph.json", causal_graph_json(sim)?),
        ("lives.json", to_json(&lives(sim)?)?),
        ("metrics.prom", sim.metrics().snapshot().to_prometheus()),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, body) in files {
        let path = dir.join(name);
        std::fs::write(&path, body)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "snapshot written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TownBuilder;
    use crate::config::DriverConfig;

    fn make_sim() -> Simulation {
        let mut config = DriverConfig::default();
        config.town.general.seed = 41;
        config.town.general.first_year = 1900;
        TownBuilder::new(config).build().expect("founded")
    }

    #[test]
    fn mayor_life_starts_with_arrival() {
        let sim = make_sim();
        let mayor = sim.town().mayor().expect("mayor");
        let json = life_events_json(&sim, mayor).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert!(!parsed.as_array().expect("array").is_empty());
    }

    #[test]
    fn everyone_has_a_life_entry() {
        let sim = make_sim();
        let lives = lives(&sim).expect("lives");
        assert_eq!(lives.len(), sim.town().population());
        assert!(lives.windows(2).all(|w| w[0].agent < w[1].agent));
    }

    #[test]
    fn snapshot_writes_all_files() {
        let sim = make_sim();
        let dir = tempfile::tempdir().expect("temp dir");
        let written = write_snapshot(&sim, &dir.path().join("out")).expect("snapshot");
        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        let graph = std::fs::read_to_string(&written[1]).expect("graph");
        assert!(graph.contains("BusinessConstruction"));
    }
}
