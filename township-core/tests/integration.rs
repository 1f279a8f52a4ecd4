//! Integration Tests — End-to-End Cascades
//!
//! These tests drive whole operations through the public API and check the
//! journal and event log they leave behind: relationship progression,
//! death with refill and inheritance, business closure, and selection
//! frequencies of the shared decision heuristic.

use township_core::company::CompanyKind;
use township_core::heuristics;
use township_core::occupation::{OccupationKind, OccupationStatus};
use township_core::relationship;
use township_core::{
    AgentId, AgentSeed, Attraction, Cascade, Cause, Effect, EventKind, EventTag, GridLayout, LotId, Personality,
    Sex, Shift, SimContext, SimDate, Simulation, SyllableNames, TownConfig,
};

fn make_config(seed: u64) -> TownConfig {
    let mut config = TownConfig::default();
    config.general.seed = seed;
    config.general.first_year = 1900;
    config.outsiders.family_population_pivot = 0.0;
    config
}

fn make_sim(seed: u64) -> Simulation {
    Simulation::new(make_config(seed), Box::new(GridLayout::new(5, 5)), Box::new(SyllableNames))
        .expect("valid config")
}

fn make_person(sim: &mut Simulation, surname: &str, sex: Sex, personality: Personality) -> AgentId {
    let (town, ctx) = sim.parts_mut();
    let agent = town.add_agent(
        AgentSeed {
            given_name: "Sam".to_string(),
            surname: surname.to_string(),
            sex,
            attraction: Attraction::heterosexual(sex),
            birth: SimDate::from_ymd(1870, 1, 1).expect("valid date"),
            personality,
        },
        ctx,
    );
    town.admit_resident(agent);
    agent
}

// ---------------------------------------------------------------------------
// Asymmetric friendship: each side crosses the threshold on its own schedule
// ---------------------------------------------------------------------------

#[test]
fn friendship_thresholds_cross_asymmetrically() {
    let mut sim = make_sim(1);
    sim.ctx_mut().set_elapsed_timesteps(100);
    let a = make_person(&mut sim, "Ash", Sex::Female, Personality::new(0.0, 0.0, 0.9, 0.5, 0.0));
    let b = make_person(&mut sim, "Birch", Sex::Female, Personality::new(0.0, 0.0, -0.9, 0.5, 0.0));

    let mut crossed_a = None;
    let mut crossed_b = None;
    for n in 1..=50 {
        let (town, ctx) = sim.parts_mut();
        let out = relationship::progress(town, ctx, a, b, 1.0).expect("progress");
        assert_eq!(out.stepped.len(), 2);
        for t in &out.transitions {
            if t.owner == a {
                crossed_a.get_or_insert(n);
            } else {
                crossed_b.get_or_insert(n);
            }
        }
        sim.reset_interaction_flags();
    }

    assert_eq!(crossed_a, Some(9));
    assert_eq!(crossed_b, Some(23));
    let town = sim.town();
    assert!(town.agent(a).expect("a").friends.contains(&b));
    assert!(town.agent(b).expect("b").friends.contains(&a));
    assert_eq!(sim.relationship_history(a, b).expect("history").len(), 2);
}

// ---------------------------------------------------------------------------
// Death of a working sole owner: terminate, refill, then inherit
// ---------------------------------------------------------------------------

#[test]
fn death_refills_job_before_house_passes_on() {
    let mut sim = make_sim(2);
    let store = sim
        .establish_company(None, CompanyKind::GroceryStore, LotId(12))
        .expect("store");
    let owner = make_person(&mut sim, "Hale", Sex::Male, Personality::default());
    let spouse = make_person(&mut sim, "Moss", Sex::Female, Personality::default());
    sim.marry(owner, spouse).expect("marry");
    let home = sim.town().agent(owner).expect("owner").home.expect("housed");
    {
        let d = sim.town_mut().dwelling_mut(home).expect("home");
        d.owners.clear();
        d.owners.insert(owner);
    }
    sim.hire_agent(store, OccupationKind::Cashier, Shift::Day, owner)
        .expect("hire");
    let job = sim.town().agent(owner).expect("owner").occupation.expect("job");

    let out = sim.die(owner).expect("die");
    let town = sim.town();
    let hirings = out.events_tagged(town, EventTag::Hiring);
    assert_eq!(hirings.len(), 1);
    assert!(out.events_tagged(town, EventTag::LayOff).is_empty());

    let vacated = out.position(Effect::Vacated(job)).expect("vacated");
    let hired = out.position(Effect::Event(hirings[0])).expect("hiring journaled");
    let ended = out.position(Effect::Ended(job)).expect("ended");
    let inherited = out
        .position(Effect::OwnershipTransferred { dwelling: home, heir: spouse })
        .expect("inherited");
    assert!(vacated < hired && hired < ended && ended < inherited);

    let death = out.root.expect("death");
    assert_eq!(town.occupation(job).expect("job").status, OccupationStatus::Ended);
    assert_eq!(town.occupation(job).expect("job").terminus, Some(death));
    assert_eq!(town.event(hirings[0]).expect("hiring").reason, Some(Cause::Occupation(job)));
    assert!(town.dwelling(home).expect("home").owners.contains(&spouse));
}

// ---------------------------------------------------------------------------
// Closing a business lays off every employee and demolishes once
// ---------------------------------------------------------------------------

#[test]
fn closure_lays_off_staff_and_demolishes() {
    let mut sim = make_sim(3);
    let store = sim
        .establish_company(None, CompanyKind::GroceryStore, LotId(12))
        .expect("store");
    for _ in 0..4 {
        let worker = sim.generate_outsider(None).expect("worker");
        sim.hire_agent(store, OccupationKind::Cashier, Shift::Day, worker)
            .expect("hire");
    }
    let out = sim.close_business(store).expect("close");
    let closure = out.root.expect("closure");
    let town = sim.town();

    let layoffs = out.events_tagged(town, EventTag::LayOff);
    assert_eq!(layoffs.len(), 4);
    let demolitions = out.events_tagged(town, EventTag::Demolition);
    assert_eq!(demolitions.len(), 1);
    assert_eq!(town.event(demolitions[0]).expect("demolition").reason, Some(Cause::Event(closure)));
    assert!(out.events_tagged(town, EventTag::Hiring).is_empty());

    let caused = sim.events_caused_by(closure);
    assert_eq!(caused.len(), 5);
    assert!(town.lot(LotId(12)).expect("lot").is_vacant());
    assert!(sim.close_business(store).is_err());
}

// ---------------------------------------------------------------------------
// Top-three selection frequencies
// ---------------------------------------------------------------------------

#[test]
fn top_three_selection_converges_to_weights() {
    let mut ctx = SimContext::new(make_config(4)).expect("ctx");
    let candidates = [("e", 1.0), ("a", 9.0), ("d", 2.0), ("b", 7.0), ("c", 5.0)];
    let mut counts = [0_u32; 3];
    let draws = 10_000;
    for _ in 0..draws {
        match heuristics::choose(&candidates, &mut ctx).expect("non-empty") {
            "a" => counts[0] += 1,
            "b" => counts[1] += 1,
            "c" => counts[2] += 1,
            other => panic!("picked {other} outside the top three"),
        }
    }
    for (count, expected) in counts.iter().zip([0.6, 0.3, 0.1]) {
        let freq = f64::from(*count) / f64::from(draws);
        assert!((freq - expected).abs() < 0.02, "frequency {freq} vs {expected}");
    }
}

// ---------------------------------------------------------------------------
// Causality graph
// ---------------------------------------------------------------------------

#[test]
fn causal_graph_links_closure_to_its_effects() {
    let mut sim = make_sim(5);
    let bar = sim.establish_company(None, CompanyKind::Bar, LotId(6)).expect("bar");
    let worker = sim.generate_outsider(None).expect("worker");
    sim.hire_agent(bar, OccupationKind::Bartender, Shift::Night, worker)
        .expect("hire");
    let out = sim.close_business(bar).expect("close");
    let closure = out.root.expect("closure");

    let graph = sim.causal_graph();
    assert_eq!(graph.nodes.len(), sim.town().events().len());
    let reached = graph.descendants(closure);
    assert_eq!(reached.len(), 2);
    assert!(graph.termini.iter().any(|t| t.by != closure));
    let json = serde_json::to_string(&graph).expect("serialize");
    assert!(json.contains("BusinessClosure"));
}

// ---------------------------------------------------------------------------
// Newcomer hiring settles the whole outsider household
// ---------------------------------------------------------------------------

#[test]
fn outsider_hire_moves_in_with_family() {
    let mut config = make_config(6);
    config.outsiders.family_population_pivot = 1.0e6;
    config.outsiders.family_chance_divisor = 1.0;
    let mut sim = Simulation::new(config, Box::new(GridLayout::new(5, 5)), Box::new(SyllableNames))
        .expect("valid config");
    let store = sim
        .establish_company(None, CompanyKind::GroceryStore, LotId(12))
        .expect("store");
    let out = sim.hire(store, OccupationKind::Cashier, Shift::Day).expect("hire");
    let hiring = out.root.expect("hiring");
    let town = sim.town();
    let EventKind::Hiring { subject, .. } = town.event(hiring).expect("event").kind else {
        panic!("root should be a hiring");
    };
    let newcomer = town.agent(subject).expect("newcomer");
    let home = newcomer.home.expect("housed");
    let spouse = newcomer.spouse.expect("arrived married");
    assert_eq!(town.agent(spouse).expect("spouse").home, Some(home));
    assert_eq!(out.events_tagged(town, EventTag::Move).len(), 1);
    assert!(town.events().iter().any(|e| e.retcon));
}

// ---------------------------------------------------------------------------
// A full town: displaced or newlywed households that cannot be housed leave
// ---------------------------------------------------------------------------

fn make_full_town(seed: u64) -> Simulation {
    let mut config = make_config(seed);
    config.marriage.male_moves_out = 1.0;
    Simulation::new(config, Box::new(GridLayout::new(1, 1)), Box::new(SyllableNames))
        .expect("valid config")
}

fn departures(sim: &Simulation, out: &Cascade) -> Vec<(AgentId, Option<Cause>)> {
    let town = sim.town();
    out.events_tagged(town, EventTag::Departure)
        .into_iter()
        .map(|id| {
            let event = town.event(id).expect("departure");
            let EventKind::Departure { subject } = event.kind else {
                panic!("tagged as a departure");
            };
            (subject, event.reason)
        })
        .collect()
}

#[test]
fn demolition_with_nowhere_to_go_sends_the_family_away() {
    let mut sim = make_full_town(11);
    let husband = make_person(&mut sim, "Hale", Sex::Male, Personality::default());
    let wife = make_person(&mut sim, "Moss", Sex::Female, Personality::default());
    sim.marry(husband, wife).expect("marry");
    let home = sim.town().agent(husband).expect("husband").home.expect("housed");
    let birth = sim.birth(wife).expect("birth");
    let EventKind::Birth { subject: baby, .. } = sim.town().event(birth.root.expect("birth")).expect("event").kind
    else {
        panic!("root should be a birth");
    };
    assert_eq!(sim.town().agent(baby).expect("baby").home, Some(home));
    for spouse in [husband, wife] {
        sim.town_mut().agent_mut(spouse).expect("spouse").retired = true;
    }
    let founder = make_person(&mut sim, "Orr", Sex::Male, Personality::default());
    let staff = [
        make_person(&mut sim, "Lowe", Sex::Female, Personality::default()),
        make_person(&mut sim, "Reed", Sex::Male, Personality::default()),
    ];

    let out = sim.found_business(founder, CompanyKind::Bar).expect("found");
    let town = sim.town();
    let demolitions = out.events_tagged(town, EventTag::Demolition);
    assert_eq!(demolitions.len(), 1);
    let demolition = demolitions[0];

    let left = departures(&sim, &out);
    let mut who: Vec<AgentId> = left.iter().map(|(agent, _)| *agent).collect();
    who.sort_unstable();
    let mut family = vec![husband, wife, baby];
    family.sort_unstable();
    assert_eq!(who, family);
    for (agent, reason) in &left {
        assert_eq!(*reason, Some(Cause::Event(demolition)), "{agent} left for another reason");
        assert!(town.agent(*agent).expect("gone").departed);
        assert!(!town.is_resident(*agent));
    }
    for agent in [founder, staff[0], staff[1]] {
        assert!(town.is_resident(agent), "{agent} should stay");
    }
    assert!(town.dwelling(home).expect("home").residents.is_empty());
    assert_eq!(sim.metrics().snapshot().housing_fallbacks, 1);
    assert_eq!(sim.failed_cascade(), None);
}

#[test]
fn divorce_in_a_full_town_sends_the_mover_away_with_their_kids() {
    let mut sim = make_full_town(12);
    let husband = make_person(&mut sim, "Hale", Sex::Male, Personality::default());
    let wife = make_person(&mut sim, "Moss", Sex::Female, Personality::default());
    sim.marry(husband, wife).expect("marry");
    let home = sim.town().agent(husband).expect("husband").home.expect("housed");
    let son = make_person(&mut sim, "Hale", Sex::Male, Personality::default());
    {
        let town = sim.town_mut();
        let s = town.agent_mut(son).expect("son");
        s.father = Some(husband);
        s.home = Some(home);
        town.agent_mut(husband).expect("husband").kids.insert(son);
        town.dwelling_mut(home).expect("home").residents.insert(son);
    }

    let out = sim.divorce(husband, wife).expect("divorce");
    let divorce = out.root.expect("divorce");
    let left = departures(&sim, &out);
    assert_eq!(
        left,
        vec![
            (husband, Some(Cause::Event(divorce))),
            (son, Some(Cause::Event(divorce))),
        ]
    );
    let town = sim.town();
    assert!(town.is_resident(wife));
    assert_eq!(town.agent(wife).expect("wife").home, Some(home));
    assert!(town.dwelling(home).expect("home").owners.contains(&wife));
    assert!(!town.dwelling(home).expect("home").owners.contains(&husband));
}

#[test]
fn newlyweds_in_a_full_town_leave_together() {
    let mut sim = make_full_town(13);
    let landlord = make_person(&mut sim, "Orr", Sex::Female, Personality::default());
    sim.settle_newcomer(landlord).expect("settle");
    let home = sim.town().agent(landlord).expect("landlord").home.expect("housed");
    let groom = make_person(&mut sim, "Hale", Sex::Male, Personality::default());
    let bride = make_person(&mut sim, "Moss", Sex::Female, Personality::default());
    let daughter = make_person(&mut sim, "Hale", Sex::Female, Personality::default());
    {
        let town = sim.town_mut();
        town.agent_mut(daughter).expect("daughter").father = Some(groom);
        town.agent_mut(groom).expect("groom").kids.insert(daughter);
        for lodger in [groom, daughter] {
            town.agent_mut(lodger).expect("lodger").home = Some(home);
            town.dwelling_mut(home).expect("home").residents.insert(lodger);
        }
    }

    let out = sim.marry(groom, bride).expect("marry");
    let wedding = out.root.expect("wedding");
    let left = departures(&sim, &out);
    let mut who: Vec<AgentId> = left.iter().map(|(agent, _)| *agent).collect();
    who.sort_unstable();
    let mut household = vec![groom, bride, daughter];
    household.sort_unstable();
    assert_eq!(who, household);
    assert!(left.iter().all(|(_, reason)| *reason == Some(Cause::Event(wedding))));
    let town = sim.town();
    assert!(out.events_tagged(town, EventTag::Move).is_empty());
    assert!(town.is_resident(landlord));
    assert_eq!(town.dwelling(home).expect("home").residents.len(), 1);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

fn scripted_run(seed: u64) -> String {
    let mut sim = make_sim(seed);
    let store = sim
        .establish_company(None, CompanyKind::GroceryStore, LotId(12))
        .expect("store");
    for _ in 0..3 {
        sim.hire(store, OccupationKind::Cashier, Shift::Day).expect("hire");
    }
    let staff: Vec<AgentId> = sim.town().residents().collect();
    sim.retire(staff[0]).expect("retire");
    sim.close_business(store).expect("close");
    let events: Vec<_> = sim.town().events().iter().collect();
    serde_json::to_string(&events).expect("serialize")
}

#[test]
fn same_seed_same_log() {
    assert_eq!(scripted_run(42), scripted_run(42));
}
