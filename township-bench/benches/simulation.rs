//! Township Benchmark Suite
//!
//! Targets:
//!   relationship_progress_single ..... < 5μs
//!   choose_top_three_from_50 ......... < 2μs
//!   closure_cascade_10_staff ......... < 500μs
//!   simulated_year_founded_town ...... < 1s

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use township_core::company::CompanyKind;
use township_core::heuristics;
use township_core::occupation::OccupationKind;
use township_core::relationship;
use township_core::{
    AgentId, AgentSeed, Attraction, GridLayout, LotId, Personality, Sex, Shift, SimContext, SimDate,
    Simulation, SyllableNames, TownConfig,
};
use township_sim::{Driver, DriverConfig};

fn make_config() -> TownConfig {
    let mut config = TownConfig::default();
    config.general.seed = 1234;
    config.general.first_year = 1900;
    config.outsiders.family_population_pivot = 0.0;
    config
}

fn make_sim() -> Simulation {
    Simulation::new(make_config(), Box::new(GridLayout::new(6, 6)), Box::new(SyllableNames))
        .expect("valid config")
}

fn make_person(sim: &mut Simulation, sex: Sex) -> AgentId {
    let (town, ctx) = sim.parts_mut();
    let agent = town.add_agent(
        AgentSeed {
            given_name: "Lee".to_string(),
            surname: "Bench".to_string(),
            sex,
            attraction: Attraction::heterosexual(sex),
            birth: SimDate::from_ymd(1875, 6, 1).expect("valid date"),
            personality: Personality::new(0.2, 0.1, 0.4, 0.3, -0.1),
        },
        ctx,
    );
    town.admit_resident(agent);
    agent
}

/// Benchmark: one mutual interaction between two agents (target: < 5μs).
fn bench_relationship_progress(c: &mut Criterion) {
    let mut sim = make_sim();
    sim.ctx_mut().set_elapsed_timesteps(500);
    let a = make_person(&mut sim, Sex::Female);
    let b = make_person(&mut sim, Sex::Male);

    c.bench_function("relationship_progress_single", |bench| {
        bench.iter(|| {
            sim.reset_interaction_flags();
            let (town, ctx) = sim.parts_mut();
            let out = relationship::progress(town, ctx, black_box(a), black_box(b), 1.0).expect("progress");
            black_box(out);
        });
    });
}

/// Benchmark: top-three choice among 50 scored candidates (target: < 2μs).
fn bench_choose(c: &mut Criterion) {
    let mut ctx = SimContext::new(make_config()).expect("ctx");
    let candidates: Vec<(usize, f64)> = (0..50).map(|i| (i, ((i * 37) % 50) as f64)).collect();

    c.bench_function("choose_top_three_from_50", |bench| {
        bench.iter(|| {
            let picked = heuristics::choose(black_box(&candidates), &mut ctx);
            black_box(picked);
        });
    });
}

/// Benchmark: closing a business with ten employees (target: < 500μs).
fn bench_closure_cascade(c: &mut Criterion) {
    c.bench_function("closure_cascade_10_staff", |bench| {
        bench.iter_batched(
            || {
                let mut sim = make_sim();
                let store = sim
                    .establish_company(None, CompanyKind::GroceryStore, LotId(14))
                    .expect("store");
                for _ in 0..10 {
                    let worker = sim.generate_outsider(None).expect("worker");
                    sim.hire_agent(store, OccupationKind::Cashier, Shift::Day, worker)
                        .expect("hire");
                }
                (sim, store)
            },
            |(mut sim, store)| {
                let out = sim.close_business(black_box(store)).expect("close");
                black_box(out);
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: one simulated year of a freshly founded town (target: < 1s).
fn bench_simulated_year(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulated_year");
    group.sample_size(10);
    group.bench_function("founded_town", |bench| {
        bench.iter_batched(
            || {
                let mut config = DriverConfig::default();
                config.town.general.seed = 99;
                Driver::new(config).expect("founded")
            },
            |mut driver| {
                let summary = driver.run_years(1).expect("run");
                black_box(summary);
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_relationship_progress,
    bench_choose,
    bench_closure_cascade,
    bench_simulated_year,
);
criterion_main!(benches);
