//! Driver Tests — Multi-Year Runs
//!
//! Founds a town, runs it for a few years and checks that the run is
//! reproducible and that the registry is still consistent afterwards.

use township_core::Simulation;
use township_sim::{Driver, DriverConfig, export};

fn make_config(seed: u64) -> DriverConfig {
    let mut config = DriverConfig::default();
    config.town.general.seed = seed;
    config.town.general.first_year = 1900;
    config
}

fn run(seed: u64, years: u32) -> Driver {
    let mut driver = Driver::new(make_config(seed)).expect("founded");
    driver.run_years(years).expect("run");
    driver
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn seeded_run_is_reproducible() {
    let a = run(7, 2);
    let b = run(7, 2);
    assert_eq!(
        export::event_log_json(a.simulation()).expect("json"),
        export::event_log_json(b.simulation()).expect("json"),
    );
    assert_eq!(a.years(), b.years());
}

// ---------------------------------------------------------------------------
// Consistency after a run
// ---------------------------------------------------------------------------

fn assert_consistent(sim: &Simulation) {
    let town = sim.town();

    let mut last = None;
    for event in town.events().iter() {
        if let Some(prev) = last {
            assert!(event.sequence > prev, "sequence went backwards");
        }
        last = Some(event.sequence);
    }

    for id in town.residents() {
        let agent = town.agent(id).expect("resident");
        assert!(agent.present(), "{id} listed as resident but gone");
        if let Some(home) = agent.home {
            assert!(town.dwelling(home).expect("home").residents.contains(&id), "{id} not in own home");
        }
        if let Some(spouse) = agent.spouse {
            let s = town.agent(spouse).expect("spouse");
            if s.present() {
                assert_eq!(s.spouse, Some(id), "{id} and {spouse} disagree on marriage");
            }
        }
        if let Some(job) = agent.occupation {
            assert_eq!(town.occupation(job).expect("job").holder, id);
        }
    }

    for company in town.companies().filter(|c| c.operating()) {
        for job in &company.employees {
            assert!(town.occupation(*job).expect("job").is_active(), "{job} at {} inactive", company.name);
        }
    }
}

#[test]
fn registry_stays_consistent_over_a_run() {
    let driver = run(8, 3);
    assert_eq!(driver.years().len(), 3);
    assert_consistent(driver.simulation());
}

#[test]
fn run_summary_tallies_the_log() {
    let mut driver = Driver::new(make_config(9)).expect("founded");
    let summary = driver.run_years(1).expect("run");
    let total: usize = summary.events.values().sum();
    assert_eq!(total, driver.simulation().town().events().len());
    assert_eq!(summary.population, driver.simulation().town().population());
    assert!(summary.counters.interactions > 0);
}
