//! Lots and dwellings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, CompanyId, DwellingId, EventId, LotId, SimDate};

/// What stands on a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Building {
    /// A house.
    Dwelling(DwellingId),
    /// A company building (for apartment complexes, it also holds the units).
    Company(CompanyId),
}

/// A parcel of land. Geometry lives in the layout collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    /// Registry handle, also the layout's index for this lot.
    pub id: LotId,
    /// Current building.
    pub building: Option<Building>,
    /// Demolished buildings, oldest first.
    pub former_buildings: Vec<Building>,
}

impl Lot {
    /// Nothing stands here.
    #[must_use]
    pub const fn is_vacant(&self) -> bool {
        self.building.is_none()
    }
}

/// House or apartment unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DwellingKind {
    /// A free-standing house.
    House,
    /// A unit inside an apartment complex.
    Apartment {
        /// The complex.
        complex: CompanyId,
        /// Unit number, from 1.
        unit: u32,
    },
}

/// A place people live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dwelling {
    /// Registry handle.
    pub id: DwellingId,
    /// House or apartment.
    pub kind: DwellingKind,
    /// Lot it stands on.
    pub lot: LotId,
    /// Current residents.
    pub residents: BTreeSet<AgentId>,
    /// Everyone who ever moved out.
    pub former_residents: BTreeSet<AgentId>,
    /// Current owners.
    pub owners: BTreeSet<AgentId>,
    /// Previous owners.
    pub former_owners: BTreeSet<AgentId>,
    /// Construction date.
    pub built: SimDate,
    /// Construction event, if one was logged.
    pub construction: Option<EventId>,
    /// Demolition event.
    pub demolition: Option<EventId>,
    /// Torn down.
    pub demolished: bool,
}

impl Dwelling {
    /// Standing and empty.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        !self.demolished && self.residents.is_empty()
    }

    /// The complex this unit belongs to, if an apartment.
    #[must_use]
    pub const fn complex(&self) -> Option<CompanyId> {
        match self.kind {
            DwellingKind::Apartment { complex, .. } => Some(complex),
            DwellingKind::House => None,
        }
    }
}
