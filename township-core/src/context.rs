//! Simulation context — clock, event-sequence allocator, random stream.
//!
//! Everything that would otherwise be ambient global state lives here and is
//! threaded through every operation as `&mut SimContext`. Two contexts built
//! from the same [`TownConfig`] produce identical draws, so independent
//! simulations can run side by side and tests stay isolated.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::TownConfig;
use crate::error::{Result, TownError};
use crate::types::{DayPhase, SimDate};

/// Date, retcon flag and sequence number assigned to a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Nominal world date.
    pub date: SimDate,
    /// Whether the date predates the live clock.
    pub retcon: bool,
    /// Global, strictly increasing sequence number.
    pub sequence: u64,
}

/// Explicit simulation context.
#[derive(Debug, Clone)]
pub struct SimContext {
    config: TownConfig,
    date: SimDate,
    phase: DayPhase,
    elapsed_timesteps: u64,
    next_sequence: u64,
    rng: ChaCha8Rng,
}

impl SimContext {
    /// Build a context starting on January 1st of `general.first_year`.
    ///
    /// # Errors
    /// Returns `TownError::Config` if the configuration fails validation or the
    /// first year is outside the supported calendar.
    pub fn new(config: TownConfig) -> Result<Self> {
        config.validate()?;
        let year = config.general.first_year;
        let date = SimDate::new_year(year)
            .ok_or_else(|| TownError::Config(format!("unsupported first year {year}")))?;
        let rng = ChaCha8Rng::seed_from_u64(config.general.seed);
        Ok(Self {
            config,
            date,
            phase: DayPhase::Day,
            elapsed_timesteps: 0,
            next_sequence: 0,
            rng,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TownConfig {
        &self.config
    }

    /// Current world date.
    #[must_use]
    pub const fn date(&self) -> SimDate {
        self.date
    }

    /// Current calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.date.year
    }

    /// Current half of the day.
    #[must_use]
    pub const fn phase(&self) -> DayPhase {
        self.phase
    }

    /// Timesteps actually simulated so far (skipped timesteps do not count).
    #[must_use]
    pub const fn elapsed_timesteps(&self) -> u64 {
        self.elapsed_timesteps
    }

    /// `n` for the normalization curve: simulated timesteps, at least 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalization_steps(&self) -> f64 {
        self.elapsed_timesteps.max(1) as f64
    }

    /// Advance the calendar one timestep (day → night → next day). Returns
    /// `true` when a new calendar day began. Whether the timestep is actually
    /// simulated is recorded separately by [`SimContext::count_simulated_timestep`].
    ///
    /// # Errors
    /// Returns `TownError::InvalidState` at the end of the supported calendar.
    pub fn advance_timestep(&mut self) -> Result<bool> {
        match self.phase {
            DayPhase::Day => {
                self.phase = DayPhase::Night;
                Ok(false)
            }
            DayPhase::Night => {
                self.date = self
                    .date
                    .succ()
                    .ok_or_else(|| TownError::invalid("advance_timestep", "calendar overflow"))?;
                self.phase = DayPhase::Day;
                Ok(true)
            }
        }
    }

    /// Record that the current timestep is simulated.
    pub fn count_simulated_timestep(&mut self) {
        self.elapsed_timesteps += 1;
    }

    /// Move the clock to `date` without counting timesteps (world generation,
    /// tests).
    pub fn set_date(&mut self, date: SimDate) {
        self.date = date;
    }

    /// Override the elapsed-timestep counter, e.g. when resuming a run.
    pub fn set_elapsed_timesteps(&mut self, timesteps: u64) {
        self.elapsed_timesteps = timesteps;
    }

    /// Allocate the next global event sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Sequence number the next event will receive.
    #[must_use]
    pub const fn peek_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Stamp a new event. A `year` before the live clock's year produces a
    /// retcon stamp with a uniformly random date in that year; `None` or any
    /// later year produces a live stamp on today's date.
    pub fn stamp(&mut self, year: Option<i32>) -> Stamp {
        let (date, retcon) = match year {
            Some(y) if y < self.date.year => (self.random_date_in(y), true),
            _ => (self.date, false),
        };
        Stamp {
            date,
            retcon,
            sequence: self.next_sequence(),
        }
    }

    /// A uniformly chosen date within `year`.
    pub fn random_date_in(&mut self, year: i32) -> SimDate {
        let days = 365 + i32::from(SimDate::days_in_year(year) == 366);
        let offset = self.rng.gen_range(0..days);
        SimDate::new_year(year)
            .and_then(|first| SimDate::from_ordinal(first.ordinal + offset))
            .unwrap_or(self.date)
    }

    // -- Draws ---------------------------------------------------------------

    /// Uniform draw in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.roll() < p
    }

    /// Uniform draw in `[lo, hi)`; `lo` when the range is empty.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    /// Uniform integer in `[lo, hi]`.
    pub fn uniform_int(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform index into a collection of `len`; `None` when empty.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    /// Normal variate via the Box–Muller transform on the shared stream.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        let u1 = 1.0 - self.roll();
        let u2 = self.roll();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + sd * z
    }

    /// Direct access for collaborators that take an `RngCore`.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}
