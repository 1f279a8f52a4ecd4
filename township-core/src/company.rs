//! Companies — businesses and public institutions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::occupation::OccupationKind;
use crate::types::{CompanyId, DwellingId, EventId, LotId, OccupationId, Shift, SimDate};

/// Kinds of company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompanyKind {
    /// Builds houses and business buildings; demolishes old ones.
    ConstructionFirm,
    /// Employs lawyers.
    LawFirm,
    /// Employs realtors.
    RealtyFirm,
    /// Public hospital; employs doctors.
    Hospital,
    /// Handles funerals.
    FuneralHome,
    /// Minds children of working mothers.
    DayCare,
    /// Bank.
    Bank,
    /// Bar.
    Bar,
    /// Grocery store.
    GroceryStore,
    /// Public school.
    School,
    /// Houses residents in apartment units.
    ApartmentComplex,
    /// Seat of the mayor.
    CityHall,
}

impl CompanyKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::ConstructionFirm,
        Self::LawFirm,
        Self::RealtyFirm,
        Self::Hospital,
        Self::FuneralHome,
        Self::DayCare,
        Self::Bank,
        Self::Bar,
        Self::GroceryStore,
        Self::School,
        Self::ApartmentComplex,
        Self::CityHall,
    ];

    /// Public institutions have no owner; the mayor makes hiring decisions.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Hospital | Self::School | Self::CityHall)
    }

    /// Whether the building contains apartment units.
    #[must_use]
    pub const fn houses_residents(self) -> bool {
        matches!(self, Self::ApartmentComplex)
    }

    /// Position held by the owner; `None` for public institutions.
    #[must_use]
    pub const fn owner_kind(self) -> Option<OccupationKind> {
        match self {
            Self::ConstructionFirm => Some(OccupationKind::Architect),
            Self::LawFirm => Some(OccupationKind::Lawyer),
            Self::RealtyFirm => Some(OccupationKind::Realtor),
            Self::FuneralHome => Some(OccupationKind::Mortician),
            Self::ApartmentComplex => Some(OccupationKind::Landlord),
            Self::DayCare | Self::Bank | Self::Bar | Self::GroceryStore => {
                Some(OccupationKind::Owner)
            }
            Self::Hospital | Self::School | Self::CityHall => None,
        }
    }

    /// Positions filled when the company is founded.
    #[must_use]
    pub const fn initial_positions(self, shift: Shift) -> &'static [OccupationKind] {
        use OccupationKind as O;
        match (self, shift) {
            (Self::ConstructionFirm, Shift::Day) => &[O::Builder, O::Builder],
            (Self::LawFirm, Shift::Day) => &[O::Secretary],
            (Self::RealtyFirm, Shift::Day) => &[O::Secretary],
            (Self::Hospital, Shift::Day) => &[O::Doctor, O::Nurse, O::Secretary],
            (Self::Hospital, Shift::Night) => &[O::Doctor, O::Nurse, O::Janitor],
            (Self::FuneralHome, Shift::Day) => &[O::Secretary],
            (Self::DayCare, Shift::Day) => &[O::DayCareProvider, O::DayCareProvider],
            (Self::Bank, Shift::Day) => &[O::Banker, O::Cashier],
            (Self::Bank, Shift::Night) => &[O::Janitor],
            (Self::Bar, Shift::Night) => &[O::Bartender, O::Bartender],
            (Self::GroceryStore, Shift::Day) => &[O::Manager, O::Cashier],
            (Self::GroceryStore, Shift::Night) => &[O::Janitor],
            (Self::School, Shift::Day) => &[O::Teacher, O::Teacher, O::Janitor],
            (Self::ApartmentComplex, Shift::Day) => &[O::Concierge],
            (Self::CityHall, Shift::Day) => &[O::Secretary],
            _ => &[],
        }
    }

    /// Positions left open at founding, filled gradually by job seekers.
    #[must_use]
    pub const fn supplemental_positions(self, shift: Shift) -> &'static [OccupationKind] {
        use OccupationKind as O;
        match (self, shift) {
            (Self::ConstructionFirm, Shift::Day) => &[O::Builder, O::Apprentice],
            (Self::LawFirm, Shift::Day) => &[O::Lawyer, O::Secretary],
            (Self::RealtyFirm, Shift::Day) => &[O::Realtor],
            (Self::Hospital, Shift::Day) => &[O::Nurse],
            (Self::Hospital, Shift::Night) => &[O::Janitor],
            (Self::FuneralHome, Shift::Day) => &[O::Apprentice],
            (Self::DayCare, Shift::Day) => &[O::DayCareProvider],
            (Self::Bank, Shift::Day) => &[O::Cashier],
            (Self::Bar, Shift::Night) => &[O::Bartender],
            (Self::GroceryStore, Shift::Day) => &[O::Cashier, O::Apprentice],
            (Self::School, Shift::Day) => &[O::Teacher],
            (Self::ApartmentComplex, Shift::Night) => &[O::Janitor],
            (Self::CityHall, Shift::Day) => &[O::Secretary],
            _ => &[],
        }
    }

    /// Word used in the company's name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConstructionFirm => "Construction",
            Self::LawFirm => "Law Offices of",
            Self::RealtyFirm => "Realty",
            Self::Hospital => "Hospital",
            Self::FuneralHome => "Funeral Home",
            Self::DayCare => "Day Care",
            Self::Bank => "Bank",
            Self::Bar => "Tavern",
            Self::GroceryStore => "Groceries",
            Self::School => "K-12 School",
            Self::ApartmentComplex => "Apartments",
            Self::CityHall => "City Hall",
        }
    }
}

/// Deferred vacancies per shift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancies {
    /// Day-shift kinds awaiting a hire.
    pub day: Vec<OccupationKind>,
    /// Night-shift kinds awaiting a hire.
    pub night: Vec<OccupationKind>,
}

impl Vacancies {
    /// Initial pool for a company kind.
    #[must_use]
    pub fn for_kind(kind: CompanyKind) -> Self {
        Self {
            day: kind.supplemental_positions(Shift::Day).to_vec(),
            night: kind.supplemental_positions(Shift::Night).to_vec(),
        }
    }

    /// Kinds open on `shift`.
    #[must_use]
    pub fn on(&self, shift: Shift) -> &[OccupationKind] {
        match shift {
            Shift::Day => &self.day,
            Shift::Night => &self.night,
        }
    }

    fn on_mut(&mut self, shift: Shift) -> &mut Vec<OccupationKind> {
        match shift {
            Shift::Day => &mut self.day,
            Shift::Night => &mut self.night,
        }
    }

    /// Remove one instance of `kind` from `shift`. Returns whether one was open.
    pub fn take(&mut self, shift: Shift, kind: OccupationKind) -> bool {
        let open = self.on_mut(shift);
        match open.iter().position(|k| *k == kind) {
            Some(i) => {
                open.remove(i);
                true
            }
            None => false,
        }
    }

    /// Return `kind` to the pool for `shift`.
    pub fn push(&mut self, shift: Shift, kind: OccupationKind) {
        self.on_mut(shift).push(kind);
    }

    /// Whether nothing is open on either shift.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.day.is_empty() && self.night.is_empty()
    }
}

/// A business or public institution, and its building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    /// Registry handle.
    pub id: CompanyId,
    /// Kind.
    pub kind: CompanyKind,
    /// Display name.
    pub name: String,
    /// Lot the building stands on.
    pub lot: LotId,
    /// Owner's position; `None` for public institutions.
    pub owner: Option<OccupationId>,
    /// Founder's position.
    pub founder: Option<OccupationId>,
    /// Active (and vacating) positions.
    pub employees: BTreeSet<OccupationId>,
    /// Ended positions.
    pub former_employees: BTreeSet<OccupationId>,
    /// Owners who left, oldest first.
    pub former_owners: Vec<OccupationId>,
    /// Deferred-vacancy pool.
    pub supplemental_vacancies: Vacancies,
    /// Apartment units (apartment complexes only).
    pub units: Vec<DwellingId>,
    /// Founding date.
    pub founded: SimDate,
    /// Closing date.
    pub closed: Option<SimDate>,
    /// Closed down.
    pub out_of_business: bool,
    /// BusinessConstruction event.
    pub construction: Option<EventId>,
    /// BusinessClosure event.
    pub closure: Option<EventId>,
}

impl Company {
    /// Open for business.
    #[must_use]
    pub const fn operating(&self) -> bool {
        !self.out_of_business
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_institutions_have_no_owner_kind() {
        for kind in CompanyKind::ALL {
            assert_eq!(kind.is_public(), kind.owner_kind().is_none(), "{kind:?}");
        }
    }

    #[test]
    fn only_apartment_complexes_house_residents() {
        let housing: Vec<_> = CompanyKind::ALL
            .into_iter()
            .filter(|k| k.houses_residents())
            .collect();
        assert_eq!(housing, vec![CompanyKind::ApartmentComplex]);
    }

    #[test]
    fn vacancy_pool_take_and_push() {
        let mut v = Vacancies::for_kind(CompanyKind::GroceryStore);
        assert!(v.take(Shift::Day, OccupationKind::Cashier));
        assert!(!v.take(Shift::Day, OccupationKind::Cashier));
        assert!(!v.take(Shift::Night, OccupationKind::Apprentice));
        v.push(Shift::Day, OccupationKind::Cashier);
        assert_eq!(v.on(Shift::Day), &[OccupationKind::Apprentice, OccupationKind::Cashier]);
    }
}
