//! Agents — the people of the town.
//!
//! An [`Agent`] is never deleted. Death and departure only flip lifecycle
//! flags, so every handle stored anywhere in the registry stays valid.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::affinity::Profile;
use crate::salience::Salience;
use crate::types::{
    AgentId, Attraction, DwellingId, EventId, MarriageId, OccupationId, Personality,
    RelationshipId, Sex, SimDate,
};

/// A cached social summary: who holds the slot and the metric that put them
/// there.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialPointer {
    /// Current holder.
    pub holder: Option<AgentId>,
    /// Raw charge or spark of the holder when last compared.
    pub extremum: f64,
}

impl SocialPointer {
    /// Empty the slot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The four singleton pointers every agent maintains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialPointers {
    /// Highest positive raw charge.
    pub best_friend: SocialPointer,
    /// Lowest negative raw charge.
    pub worst_enemy: SocialPointer,
    /// Highest positive raw spark.
    pub love_interest: SocialPointer,
    /// Spouse; set only by marriage, divorce and death.
    pub significant_other: Option<AgentId>,
}

/// Identity and temperament of a new agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSeed {
    /// Given name.
    pub given_name: String,
    /// Surname.
    pub surname: String,
    /// Sex.
    pub sex: Sex,
    /// Attraction set.
    pub attraction: Attraction,
    /// Birth date.
    pub birth: SimDate,
    /// Personality.
    pub personality: Personality,
}

/// A person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Registry handle.
    pub id: AgentId,
    /// Given name.
    pub given_name: String,
    /// Current surname.
    pub surname: String,
    /// Surname at birth.
    pub maiden_name: String,
    /// Sex.
    pub sex: Sex,
    /// Attraction set.
    pub attraction: Attraction,
    /// Birth date.
    pub birth: SimDate,
    /// Age in completed years, updated on birthdays.
    pub age: u32,
    /// Personality.
    pub personality: Personality,

    /// Alive.
    pub alive: bool,
    /// Left town permanently.
    pub departed: bool,
    /// Adult (at least `life_cycle.adult_age`).
    pub adult: bool,
    /// Eligible for hiring.
    pub in_workforce: bool,
    /// Retired.
    pub retired: bool,
    /// Holds a college degree.
    pub college_graduate: bool,
    /// Money on hand.
    pub money: f64,

    /// Current home.
    pub home: Option<DwellingId>,
    /// Current occupation.
    pub occupation: Option<OccupationId>,
    /// Every occupation ever held, oldest first.
    pub occupations: Vec<OccupationId>,

    /// Biological mother.
    pub mother: Option<AgentId>,
    /// Biological father.
    pub father: Option<AgentId>,
    /// Adoptive parents.
    pub adoptive_parents: BTreeSet<AgentId>,
    /// Kids, biological and adopted.
    pub kids: BTreeSet<AgentId>,
    /// Current spouse.
    pub spouse: Option<AgentId>,
    /// Current marriage.
    pub marriage: Option<MarriageId>,
    /// Every marriage, oldest first.
    pub marriages: Vec<MarriageId>,
    /// Parents, siblings, kids, spouse.
    pub immediate_family: BTreeSet<AgentId>,
    /// Immediate family plus grandparents, grandkids, aunts, uncles, cousins,
    /// nieces, nephews, and in-laws joined by marriage.
    pub extended_family: BTreeSet<AgentId>,

    /// Current acquaintances (records of kind Acquaintance).
    pub acquaintances: BTreeSet<AgentId>,
    /// Current friends.
    pub friends: BTreeSet<AgentId>,
    /// Current enemies.
    pub enemies: BTreeSet<AgentId>,
    /// Current neighbors.
    pub neighbors: BTreeSet<AgentId>,
    /// Former neighbors.
    pub former_neighbors: BTreeSet<AgentId>,
    /// Current coworkers.
    pub coworkers: BTreeSet<AgentId>,
    /// Former coworkers.
    pub former_coworkers: BTreeSet<AgentId>,
    /// Contractors this agent has hired before.
    pub former_contractors: BTreeSet<AgentId>,

    /// Current relationship record per counterpart.
    pub ledger: BTreeMap<AgentId, RelationshipId>,
    /// Salience map.
    pub salience: Salience,
    /// Social pointers.
    pub pointers: SocialPointers,

    /// Lost a spouse to death.
    pub widowed: bool,
    /// Grieving a spouse.
    pub grieving: bool,
    /// Life events this agent took part in, by sequence number.
    pub life_events: Vec<EventId>,
}

impl Agent {
    /// Build an agent from a seed. The agent is alive but not yet a resident.
    #[must_use]
    pub fn new(id: AgentId, seed: AgentSeed, today: SimDate, adult_age: u32, working_age: u32) -> Self {
        let age = seed.birth.age_on(today);
        Self {
            id,
            maiden_name: seed.surname.clone(),
            given_name: seed.given_name,
            surname: seed.surname,
            sex: seed.sex,
            attraction: seed.attraction,
            birth: seed.birth,
            age,
            personality: seed.personality,
            alive: true,
            departed: false,
            adult: age >= adult_age,
            in_workforce: age >= working_age,
            retired: false,
            college_graduate: false,
            money: 0.0,
            home: None,
            occupation: None,
            occupations: Vec::new(),
            mother: None,
            father: None,
            adoptive_parents: BTreeSet::new(),
            kids: BTreeSet::new(),
            spouse: None,
            marriage: None,
            marriages: Vec::new(),
            immediate_family: BTreeSet::new(),
            extended_family: BTreeSet::new(),
            acquaintances: BTreeSet::new(),
            friends: BTreeSet::new(),
            enemies: BTreeSet::new(),
            neighbors: BTreeSet::new(),
            former_neighbors: BTreeSet::new(),
            coworkers: BTreeSet::new(),
            former_coworkers: BTreeSet::new(),
            former_contractors: BTreeSet::new(),
            ledger: BTreeMap::new(),
            salience: Salience::default(),
            pointers: SocialPointers::default(),
            widowed: false,
            grieving: false,
            life_events: Vec::new(),
        }
    }

    /// Alive and not departed.
    #[must_use]
    pub const fn present(&self) -> bool {
        self.alive && !self.departed
    }

    /// "Given Surname".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.surname)
    }

    /// What the affinity model needs to know about this agent.
    #[must_use]
    pub const fn profile(&self) -> Profile {
        Profile {
            personality: self.personality,
            sex: self.sex,
            attraction: self.attraction,
            age: self.age,
            adult: self.adult,
        }
    }

    /// Biological and adoptive parents.
    #[must_use]
    pub fn parents(&self) -> BTreeSet<AgentId> {
        let mut parents = self.adoptive_parents.clone();
        parents.extend(self.mother);
        parents.extend(self.father);
        parents
    }

    /// Best friend, if any.
    #[must_use]
    pub const fn best_friend(&self) -> Option<AgentId> {
        self.pointers.best_friend.holder
    }

    /// Worst enemy, if any.
    #[must_use]
    pub const fn worst_enemy(&self) -> Option<AgentId> {
        self.pointers.worst_enemy.holder
    }

    /// Love interest, if any.
    #[must_use]
    pub const fn love_interest(&self) -> Option<AgentId> {
        self.pointers.love_interest.holder
    }

    /// Significant other, if any.
    #[must_use]
    pub const fn significant_other(&self) -> Option<AgentId> {
        self.pointers.significant_other
    }
}
