//! Core type definitions for the township simulation.
//!
//! Every registry record is addressed by a small copyable handle. Handles are
//! positions in the [`Town`](crate::town::Town) registry; relationships and
//! causal links are lookups through them, never owning references.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the record in its registry vector.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Handle for the record that will be pushed onto a registry of `len`.
            #[allow(clippy::cast_possible_truncation)]
            pub(crate) const fn next(len: usize) -> Self {
                Self(len as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// A person, resident or not, living or dead.
    AgentId,
    "agent"
);
handle!(
    /// One directional relationship record (owner's view of a subject).
    RelationshipId,
    "relationship"
);
handle!(
    /// A position held by one agent at one company over one interval.
    OccupationId,
    "occupation"
);
handle!(
    /// A business or public institution.
    CompanyId,
    "company"
);
handle!(
    /// A house or an apartment unit.
    DwellingId,
    "dwelling"
);
handle!(
    /// A parcel of land supplied by the spatial layer.
    LotId,
    "lot"
);
handle!(
    /// A life event in the global log.
    EventId,
    "event"
);
handle!(
    /// A marriage, from wedding to terminus.
    MarriageId,
    "marriage"
);

// ---------------------------------------------------------------------------
// Persons
// ---------------------------------------------------------------------------

/// Biological sex, used by the affinity model's sex-keyed weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Sex {
    /// The other sex.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

/// Which sexes an agent can feel romantic attraction toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attraction {
    /// Attracted to men.
    pub men: bool,
    /// Attracted to women.
    pub women: bool,
}

impl Attraction {
    /// Attraction to the opposite sex only.
    #[must_use]
    pub const fn heterosexual(sex: Sex) -> Self {
        match sex {
            Sex::Male => Self { men: false, women: true },
            Sex::Female => Self { men: true, women: false },
        }
    }

    /// Whether someone of `sex` falls inside this attraction set.
    #[must_use]
    pub const fn includes(self, sex: Sex) -> bool {
        match sex {
            Sex::Male => self.men,
            Sex::Female => self.women,
        }
    }
}

/// Five-factor personality. Every trait is clamped to `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Personality {
    /// Openness to experience.
    pub openness: f64,
    /// Conscientiousness.
    pub conscientiousness: f64,
    /// Extroversion.
    pub extroversion: f64,
    /// Agreeableness.
    pub agreeableness: f64,
    /// Neuroticism.
    pub neuroticism: f64,
}

impl Personality {
    /// Build a personality, clamping every trait into range.
    #[must_use]
    pub fn new(
        openness: f64,
        conscientiousness: f64,
        extroversion: f64,
        agreeableness: f64,
        neuroticism: f64,
    ) -> Self {
        Self {
            openness: openness.clamp(-1.0, 1.0),
            conscientiousness: conscientiousness.clamp(-1.0, 1.0),
            extroversion: extroversion.clamp(-1.0, 1.0),
            agreeableness: agreeableness.clamp(-1.0, 1.0),
            neuroticism: neuroticism.clamp(-1.0, 1.0),
        }
    }

    /// Traits in canonical order: O, C, E, A, N.
    #[must_use]
    pub const fn traits(&self) -> [f64; 5] {
        [
            self.openness,
            self.conscientiousness,
            self.extroversion,
            self.agreeableness,
            self.neuroticism,
        ]
    }

    /// Inverse of [`Personality::traits`], clamping as [`Personality::new`] does.
    #[must_use]
    pub fn from_traits(t: [f64; 5]) -> Self {
        Self::new(t[0], t[1], t[2], t[3], t[4])
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A world date. `ordinal` counts days from 0001-01-01 (day 1), so it is
/// strictly monotonic across years and usable for experience arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimDate {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Days since the common era began.
    pub ordinal: i32,
}

impl SimDate {
    /// Build a date from a calendar triple. `None` if the triple is not a real date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_naive)
    }

    /// Build a date from a day count since the common era.
    #[must_use]
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        NaiveDate::from_num_days_from_ce_opt(ordinal).map(Self::from_naive)
    }

    /// Build from a chrono date.
    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            ordinal: date.num_days_from_ce(),
        }
    }

    /// January 1st of `year`.
    #[must_use]
    pub fn new_year(year: i32) -> Option<Self> {
        Self::from_ymd(year, 1, 1)
    }

    /// Number of days in `year`.
    #[must_use]
    pub fn days_in_year(year: i32) -> u32 {
        if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 }
    }

    /// The following calendar day. `None` only at the end of chrono's range.
    #[must_use]
    pub fn succ(self) -> Option<Self> {
        Self::from_ordinal(self.ordinal + 1)
    }

    /// Fractional years (365-day) from `earlier` to `self`; never negative.
    #[must_use]
    pub fn years_since(self, earlier: Self) -> f64 {
        f64::from((self.ordinal - earlier.ordinal).max(0)) / 365.0
    }

    /// Completed years of someone born on `self`, as of `today`.
    #[must_use]
    pub fn age_on(self, today: Self) -> u32 {
        let mut years = today.year - self.year;
        if (today.month, today.day) < (self.month, self.day) {
            years -= 1;
        }
        u32::try_from(years).unwrap_or(0)
    }

    /// Whether `other` falls on the same month and day as `self`.
    #[must_use]
    pub const fn same_day_of_year(self, other: Self) -> bool {
        self.month == other.month && self.day == other.day
    }
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Half of a simulated day. Each timestep is one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    /// Daytime.
    Day,
    /// Nighttime.
    Night,
}

/// Which half of the day a job is worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    /// Day shift.
    Day,
    /// Night shift.
    Night,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personality_clamps_every_trait() {
        let p = Personality::new(2.0, -3.0, 0.5, 1.5, -0.25);
        assert_eq!(p.traits(), [1.0, -1.0, 0.5, 1.0, -0.25]);
    }

    #[test]
    fn ordinal_is_monotonic_across_years() {
        let dec = SimDate::from_ymd(1899, 12, 31).expect("valid date");
        let jan = SimDate::from_ymd(1900, 1, 1).expect("valid date");
        assert_eq!(jan.ordinal, dec.ordinal + 1);
        assert!(jan > dec);
        assert_eq!(dec.succ(), Some(jan));
    }

    #[test]
    fn age_counts_completed_years() {
        let birth = SimDate::from_ymd(1880, 6, 15).expect("valid date");
        let before = SimDate::from_ymd(1900, 6, 14).expect("valid date");
        let on = SimDate::from_ymd(1900, 6, 15).expect("valid date");
        assert_eq!(birth.age_on(before), 19);
        assert_eq!(birth.age_on(on), 20);
        assert_eq!(on.age_on(birth), 0);
    }

    #[test]
    fn leap_years_have_366_days() {
        assert_eq!(SimDate::days_in_year(1900), 365);
        assert_eq!(SimDate::days_in_year(1904), 366);
        assert_eq!(SimDate::days_in_year(2000), 366);
    }

    #[test]
    fn attraction_membership() {
        let a = Attraction::heterosexual(Sex::Female);
        assert!(a.includes(Sex::Male));
        assert!(!a.includes(Sex::Female));
    }

    #[test]
    fn handles_display_with_prefix() {
        assert_eq!(AgentId(7).to_string(), "agent#7");
        assert_eq!(EventId(0).to_string(), "event#0");
    }
}
