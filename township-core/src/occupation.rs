//! Occupations — positions held by one agent at one company.
//!
//! An [`Occupation`] moves `Active → Vacating → Ended`. `Vacating` exists
//! only inside a termination cascade: the refill hire is made while the
//! outgoing record is still vacating, and the record is marked ended after.
//!
//! | Flags                      | On termination                         |
//! |----------------------------|----------------------------------------|
//! | neither                    | refilled by one new Hiring             |
//! | `supplemental`             | returned to the deferred-vacancy pool  |
//! | `hired_as_favor`           | discarded, never refilled              |

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, CompanyId, EventId, OccupationId, Shift, SimDate};

/// Kinds of position. Capabilities are explicit methods, never type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OccupationKind {
    /// Learns a trade; promoted outright into higher positions.
    Apprentice,
    /// Designs houses and business buildings.
    Architect,
    /// Works at a bank.
    Banker,
    /// Tends bar.
    Bartender,
    /// Builds houses.
    Builder,
    /// Runs a register.
    Cashier,
    /// Fronts an apartment complex.
    Concierge,
    /// Minds children at a day care.
    DayCareProvider,
    /// Delivers babies and treats patients.
    Doctor,
    /// Cleans at night.
    Janitor,
    /// Owns an apartment complex.
    Landlord,
    /// Handles name changes and divorces.
    Lawyer,
    /// Manages a store.
    Manager,
    /// Handles funerals.
    Mortician,
    /// Assists doctors.
    Nurse,
    /// Owns a business.
    Owner,
    /// Brokers home sales.
    Realtor,
    /// Office work.
    Secretary,
    /// Teaches school.
    Teacher,
}

impl OccupationKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Apprentice,
        Self::Architect,
        Self::Banker,
        Self::Bartender,
        Self::Builder,
        Self::Cashier,
        Self::Concierge,
        Self::DayCareProvider,
        Self::Doctor,
        Self::Janitor,
        Self::Landlord,
        Self::Lawyer,
        Self::Manager,
        Self::Mortician,
        Self::Nurse,
        Self::Owner,
        Self::Realtor,
        Self::Secretary,
        Self::Teacher,
    ];

    /// Prestige level used by hiring qualification and job-level damping.
    #[must_use]
    pub const fn level(self) -> f64 {
        match self {
            Self::Apprentice
            | Self::Bartender
            | Self::Builder
            | Self::Cashier
            | Self::Concierge
            | Self::DayCareProvider
            | Self::Janitor
            | Self::Nurse
            | Self::Secretary => 1.0,
            Self::Landlord | Self::Manager | Self::Realtor | Self::Teacher => 2.0,
            Self::Banker | Self::Mortician => 3.0,
            Self::Architect | Self::Lawyer => 4.0,
            Self::Doctor | Self::Owner => 5.0,
        }
    }

    /// Whether candidates must hold a college degree.
    #[must_use]
    pub const fn requires_college_degree(self) -> bool {
        matches!(self, Self::Architect | Self::Doctor | Self::Lawyer | Self::Teacher)
    }

    /// Hiring or losing one of these rebuilds the firm's name.
    #[must_use]
    pub const fn renames_firm(self) -> bool {
        matches!(self, Self::Lawyer)
    }

    /// Holders are promoted outright into higher positions at their company.
    #[must_use]
    pub const fn is_apprentice(self) -> bool {
        matches!(self, Self::Apprentice)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Apprentice => "apprentice",
            Self::Architect => "architect",
            Self::Banker => "banker",
            Self::Bartender => "bartender",
            Self::Builder => "builder",
            Self::Cashier => "cashier",
            Self::Concierge => "concierge",
            Self::DayCareProvider => "day care provider",
            Self::Doctor => "doctor",
            Self::Janitor => "janitor",
            Self::Landlord => "landlord",
            Self::Lawyer => "lawyer",
            Self::Manager => "manager",
            Self::Mortician => "mortician",
            Self::Nurse => "nurse",
            Self::Owner => "owner",
            Self::Realtor => "realtor",
            Self::Secretary => "secretary",
            Self::Teacher => "teacher",
        }
    }
}

/// Lifecycle state of a position record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupationStatus {
    /// Filled and working.
    Active,
    /// Termination in progress; the refill may already exist.
    Vacating,
    /// Terminated.
    Ended,
}

/// What happens to a position when its holder leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefillPolicy {
    /// Synthesize one Hiring for the same kind and shift.
    Refill,
    /// Return the kind to the company's deferred-vacancy pool.
    Pool,
    /// Drop the position permanently.
    Discard,
}

/// One agent's tenure in one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occupation {
    /// Registry handle.
    pub id: OccupationId,
    /// The agent holding the position.
    pub holder: AgentId,
    /// Employer.
    pub company: CompanyId,
    /// Kind of position.
    pub kind: OccupationKind,
    /// Shift worked.
    pub shift: Shift,
    /// Lifecycle state.
    pub status: OccupationStatus,
    /// First day.
    pub start: SimDate,
    /// Last day.
    pub end: Option<SimDate>,
    /// Hiring event that created the position.
    pub hiring: Option<EventId>,
    /// Event that ended the position.
    pub terminus: Option<EventId>,
    /// Position this one refilled.
    pub preceded_by: Option<OccupationId>,
    /// Position that refilled this one.
    pub succeeded_by: Option<OccupationId>,
    /// Filled from the deferred-vacancy pool.
    pub supplemental: bool,
    /// Created for a relative of the owner beyond every vacancy.
    pub hired_as_favor: bool,
}

impl Occupation {
    /// Filled and working.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, OccupationStatus::Active)
    }

    /// Prestige level of the position.
    #[must_use]
    pub const fn level(&self) -> f64 {
        self.kind.level()
    }

    /// Years in this position as of `today` (or its end date).
    #[must_use]
    pub fn years_experience(&self, today: SimDate) -> f64 {
        self.end.unwrap_or(today).years_since(self.start)
    }

    /// What termination does with this position.
    #[must_use]
    pub const fn refill_policy(&self) -> RefillPolicy {
        if self.hired_as_favor {
            RefillPolicy::Discard
        } else if self.supplemental {
            RefillPolicy::Pool
        } else {
            RefillPolicy::Refill
        }
    }
}
