//! Runtime metrics and instrumentation.
//!
//! Lock-free `AtomicU64` counters for the cascade engine, plus a cascade-size
//! histogram behind a `parking_lot::Mutex` (read rarely, on export). Each
//! [`Simulation`](crate::simulation::Simulation) owns its own counters so that
//! independent simulations never share state.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::event::EventTag;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for engine activity.
pub struct SimCounters {
    /// Events appended to the log, live and retconned.
    pub events_created: AtomicU64,
    /// Events appended with a retcon date.
    pub retcon_events: AtomicU64,
    /// Top-level cascades run to completion.
    pub cascades_run: AtomicU64,
    /// Hiring events.
    pub hires: AtomicU64,
    /// Occupations terminated.
    pub terminations: AtomicU64,
    /// Hirings synthesized to refill a vacated position.
    pub refills: AtomicU64,
    /// Vacated positions returned to a deferred-vacancy pool.
    pub pooled_vacancies: AtomicU64,
    /// Agents who left town.
    pub departures: AtomicU64,
    /// Outsiders generated to fill positions.
    pub outsiders: AtomicU64,
    /// Housing searches that ended in a fallback (complex, lodging, departure).
    pub housing_fallbacks: AtomicU64,
    /// Contracted services done without a contractor.
    pub self_service: AtomicU64,
    /// Pairwise relationship progressions (one per side).
    pub interactions: AtomicU64,
    /// Acquaintance → Friendship/Enmity transitions.
    pub transitions: AtomicU64,
}

impl SimCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events_created: AtomicU64::new(0),
            retcon_events: AtomicU64::new(0),
            cascades_run: AtomicU64::new(0),
            hires: AtomicU64::new(0),
            terminations: AtomicU64::new(0),
            refills: AtomicU64::new(0),
            pooled_vacancies: AtomicU64::new(0),
            departures: AtomicU64::new(0),
            outsiders: AtomicU64::new(0),
            housing_fallbacks: AtomicU64::new(0),
            self_service: AtomicU64::new(0),
            interactions: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
        }
    }

    /// Record one logged event.
    pub fn record_event(&self, tag: EventTag, retcon: bool) {
        self.events_created.fetch_add(1, Ordering::Relaxed);
        if retcon {
            self.retcon_events.fetch_add(1, Ordering::Relaxed);
        }
        match tag {
            EventTag::Hiring => {
                self.hires.fetch_add(1, Ordering::Relaxed);
            }
            EventTag::Departure => {
                self.departures.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Bump a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events_created: self.events_created.load(Ordering::Relaxed),
            retcon_events: self.retcon_events.load(Ordering::Relaxed),
            cascades_run: self.cascades_run.load(Ordering::Relaxed),
            hires: self.hires.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
            refills: self.refills.load(Ordering::Relaxed),
            pooled_vacancies: self.pooled_vacancies.load(Ordering::Relaxed),
            departures: self.departures.load(Ordering::Relaxed),
            outsiders: self.outsiders.load(Ordering::Relaxed),
            housing_fallbacks: self.housing_fallbacks.load(Ordering::Relaxed),
            self_service: self.self_service.load(Ordering::Relaxed),
            interactions: self.interactions.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
        }
    }
}

impl Default for SimCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SimCounters").field(&self.snapshot()).finish()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CounterSnapshot {
    /// Events appended.
    pub events_created: u64,
    /// Retconned events appended.
    pub retcon_events: u64,
    /// Cascades completed.
    pub cascades_run: u64,
    /// Hiring events.
    pub hires: u64,
    /// Occupations terminated.
    pub terminations: u64,
    /// Refill hirings.
    pub refills: u64,
    /// Pooled vacancies.
    pub pooled_vacancies: u64,
    /// Departures.
    pub departures: u64,
    /// Outsiders generated.
    pub outsiders: u64,
    /// Housing fallbacks.
    pub housing_fallbacks: u64,
    /// Self-service fallbacks.
    pub self_service: u64,
    /// Relationship progressions.
    pub interactions: u64,
    /// Category transitions.
    pub transitions: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 13] = [
            ("events_created", "Events appended to the log", self.events_created),
            ("retcon_events", "Events dated before the live clock", self.retcon_events),
            ("cascades_run", "Top-level cascades completed", self.cascades_run),
            ("hires", "Hiring events", self.hires),
            ("terminations", "Occupations terminated", self.terminations),
            ("refills", "Hirings that refilled a vacated position", self.refills),
            ("pooled_vacancies", "Positions returned to a vacancy pool", self.pooled_vacancies),
            ("departures", "Agents who left town", self.departures),
            ("outsiders", "Outsiders generated to fill positions", self.outsiders),
            ("housing_fallbacks", "Housing searches ending in a fallback", self.housing_fallbacks),
            ("self_service", "Services done without a contractor", self.self_service),
            ("interactions", "Relationship progressions", self.interactions),
            ("transitions", "Relationship category transitions", self.transitions),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP township_{name}_total {help}\n\
                 # TYPE township_{name}_total counter\n\
                 township_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Cascade-size histogram
// ---------------------------------------------------------------------------

/// Upper bounds (inclusive) of the cascade-size buckets, in journal effects.
pub const CASCADE_BUCKETS: [u64; 7] = [1, 2, 4, 8, 16, 32, 64];

/// How many effects each cascade produced, bucketed.
#[derive(Debug, Default)]
pub struct CascadeHistogram {
    inner: Mutex<HistogramState>,
}

#[derive(Debug, Default)]
struct HistogramState {
    /// One slot per bucket plus overflow.
    counts: [u64; CASCADE_BUCKETS.len() + 1],
    largest: u64,
    total: u64,
}

impl CascadeHistogram {
    /// Record a cascade of `size` effects.
    pub fn record(&self, size: u64) {
        let mut h = self.inner.lock();
        let slot = CASCADE_BUCKETS
            .iter()
            .position(|&bound| size <= bound)
            .unwrap_or(CASCADE_BUCKETS.len());
        h.counts[slot] += 1;
        h.largest = h.largest.max(size);
        h.total += 1;
    }

    /// Per-bucket counts; the last slot is the overflow bucket.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.inner.lock().counts.to_vec()
    }

    /// Largest cascade observed.
    #[must_use]
    pub fn largest(&self) -> u64 {
        self.inner.lock().largest
    }

    /// Cascades recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.lock().total
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::debug_span!`.
pub mod spans {
    /// One top-level cascade.
    pub const CASCADE: &str = "township::cascade";
    /// Relationship progression.
    pub const PROGRESS: &str = "township::relationship::progress";
    /// Socializing pass for one agent.
    pub const SOCIALIZE: &str = "township::socialize";
    /// Hiring search.
    pub const HIRE: &str = "township::occupation::hire";
    /// Occupation termination.
    pub const TERMINATE: &str = "township::occupation::terminate";
    /// Home search.
    pub const SECURE_HOME: &str = "township::housing::secure_home";
    /// Business founding.
    pub const FOUND_BUSINESS: &str = "township::business::found";
    /// Business closure.
    pub const CLOSE_BUSINESS: &str = "township::business::close";
    /// Outsider generation with retconned backstory.
    pub const OUTSIDER: &str = "township::outsider";
}
