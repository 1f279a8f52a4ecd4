//! Event Log — tagged life events, global sequencing, causal links.
//!
//! Events are append-only and immutable. Each one receives the next value of
//! the context's sequence counter at creation, independent of its nominal
//! date, so the log order is a total order even across retconned history.
//!
//! Causal structure is a forward DAG: an event's optional [`Cause`] points at
//! the earlier event (or replaced occupation) that triggered it, and the
//! `terminus` fields on occupations and marriages point at the event that
//! ended them.

use serde::{Deserialize, Serialize};

use crate::context::Stamp;
use crate::dwelling::Building;
use crate::occupation::OccupationKind;
use crate::town::Town;
use crate::types::{
    AgentId, CompanyId, DwellingId, EventId, LotId, MarriageId, OccupationId, SimDate,
};

/// Why an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    /// An earlier event.
    Event(EventId),
    /// A position that was vacated (refill hirings).
    Occupation(OccupationId),
}

/// Concrete event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A baby is born.
    Birth {
        /// The baby.
        subject: AgentId,
        /// Mother.
        mother: AgentId,
        /// Father, if known.
        father: Option<AgentId>,
        /// Delivering doctor.
        doctor: Option<OccupationId>,
    },
    /// A child is adopted.
    Adoption {
        /// The child.
        subject: AgentId,
        /// New parents.
        parents: Vec<AgentId>,
    },
    /// Someone dies.
    Death {
        /// The deceased.
        subject: AgentId,
        /// Surviving spouse.
        widow: Option<AgentId>,
        /// Next of kin at the time of death.
        next_of_kin: Option<AgentId>,
        /// Mortician who handled the funeral.
        mortician: Option<OccupationId>,
    },
    /// Two agents marry.
    Marriage {
        /// The spouses.
        spouses: [AgentId; 2],
        /// Marriage record.
        marriage: MarriageId,
    },
    /// Two spouses divorce.
    Divorce {
        /// The former spouses.
        spouses: [AgentId; 2],
        /// Marriage record.
        marriage: MarriageId,
        /// Lawyer who filed.
        lawyer: Option<OccupationId>,
    },
    /// Someone takes a position.
    Hiring {
        /// New hire.
        subject: AgentId,
        /// Employer.
        company: CompanyId,
        /// The new position.
        occupation: OccupationId,
        /// Kind of position.
        kind: OccupationKind,
        /// The hire already worked at this company.
        promotion: bool,
    },
    /// Someone loses a position because the company closed.
    LayOff {
        /// Laid-off employee.
        subject: AgentId,
        /// Employer.
        company: CompanyId,
        /// The lost position.
        occupation: OccupationId,
    },
    /// Someone retires.
    Retirement {
        /// Retiree.
        subject: AgentId,
        /// Position retired from.
        occupation: Option<OccupationId>,
    },
    /// A household changes homes.
    Move {
        /// Everyone who moved.
        subjects: Vec<AgentId>,
        /// Previous home (none for newcomers and newborns).
        from: Option<DwellingId>,
        /// New home.
        to: DwellingId,
    },
    /// Someone leaves town for good.
    Departure {
        /// The departing agent.
        subject: AgentId,
    },
    /// A building is torn down.
    Demolition {
        /// Lot cleared.
        lot: LotId,
        /// What stood there.
        building: Building,
        /// Construction firm that did the work.
        demolition_company: Option<CompanyId>,
    },
    /// A company shuts down.
    BusinessClosure {
        /// The company.
        company: CompanyId,
    },
    /// Someone changes surname.
    NameChange {
        /// Agent renamed.
        subject: AgentId,
        /// Surname before.
        old_surname: String,
        /// Surname after.
        new_surname: String,
        /// Lawyer who filed.
        lawyer: Option<OccupationId>,
    },
    /// A home is bought.
    HomePurchase {
        /// New owners.
        buyers: Vec<AgentId>,
        /// The home.
        home: DwellingId,
        /// Previous owners.
        sellers: Vec<AgentId>,
        /// Realtor who brokered the sale.
        realtor: Option<OccupationId>,
    },
    /// A house is built.
    HouseConstruction {
        /// Clients (new owners).
        clients: Vec<AgentId>,
        /// Lot built on.
        lot: LotId,
        /// The new house.
        house: DwellingId,
        /// Architect; `None` means the clients built it themselves.
        architect: Option<OccupationId>,
        /// Builders employed by the architect's firm.
        builders: Vec<AgentId>,
    },
    /// A business building is built.
    BusinessConstruction {
        /// Founder.
        client: AgentId,
        /// The new company.
        company: CompanyId,
        /// Lot built on.
        lot: LotId,
        /// Architect; `None` means the founder built it.
        architect: Option<OccupationId>,
        /// Demolition that cleared the lot, if one was needed.
        demolition: Option<EventId>,
    },
}

/// Fieldless discriminant of [`EventKind`], for counting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventTag {
    /// [`EventKind::Birth`].
    Birth,
    /// [`EventKind::Adoption`].
    Adoption,
    /// [`EventKind::Death`].
    Death,
    /// [`EventKind::Marriage`].
    Marriage,
    /// [`EventKind::Divorce`].
    Divorce,
    /// [`EventKind::Hiring`].
    Hiring,
    /// [`EventKind::LayOff`].
    LayOff,
    /// [`EventKind::Retirement`].
    Retirement,
    /// [`EventKind::Move`].
    Move,
    /// [`EventKind::Departure`].
    Departure,
    /// [`EventKind::Demolition`].
    Demolition,
    /// [`EventKind::BusinessClosure`].
    BusinessClosure,
    /// [`EventKind::NameChange`].
    NameChange,
    /// [`EventKind::HomePurchase`].
    HomePurchase,
    /// [`EventKind::HouseConstruction`].
    HouseConstruction,
    /// [`EventKind::BusinessConstruction`].
    BusinessConstruction,
}

impl EventTag {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Birth,
        Self::Adoption,
        Self::Death,
        Self::Marriage,
        Self::Divorce,
        Self::Hiring,
        Self::LayOff,
        Self::Retirement,
        Self::Move,
        Self::Departure,
        Self::Demolition,
        Self::BusinessClosure,
        Self::NameChange,
        Self::HomePurchase,
        Self::HouseConstruction,
        Self::BusinessConstruction,
    ];

    /// snake_case label for logs and exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Adoption => "adoption",
            Self::Death => "death",
            Self::Marriage => "marriage",
            Self::Divorce => "divorce",
            Self::Hiring => "hiring",
            Self::LayOff => "lay_off",
            Self::Retirement => "retirement",
            Self::Move => "move",
            Self::Departure => "departure",
            Self::Demolition => "demolition",
            Self::BusinessClosure => "business_closure",
            Self::NameChange => "name_change",
            Self::HomePurchase => "home_purchase",
            Self::HouseConstruction => "house_construction",
            Self::BusinessConstruction => "business_construction",
        }
    }
}

impl EventKind {
    /// Discriminant.
    #[must_use]
    pub const fn tag(&self) -> EventTag {
        match self {
            Self::Birth { .. } => EventTag::Birth,
            Self::Adoption { .. } => EventTag::Adoption,
            Self::Death { .. } => EventTag::Death,
            Self::Marriage { .. } => EventTag::Marriage,
            Self::Divorce { .. } => EventTag::Divorce,
            Self::Hiring { .. } => EventTag::Hiring,
            Self::LayOff { .. } => EventTag::LayOff,
            Self::Retirement { .. } => EventTag::Retirement,
            Self::Move { .. } => EventTag::Move,
            Self::Departure { .. } => EventTag::Departure,
            Self::Demolition { .. } => EventTag::Demolition,
            Self::BusinessClosure { .. } => EventTag::BusinessClosure,
            Self::NameChange { .. } => EventTag::NameChange,
            Self::HomePurchase { .. } => EventTag::HomePurchase,
            Self::HouseConstruction { .. } => EventTag::HouseConstruction,
            Self::BusinessConstruction { .. } => EventTag::BusinessConstruction,
        }
    }

    /// Agents whose life-event sequence records this event.
    #[must_use]
    pub fn subjects(&self) -> Vec<AgentId> {
        match self {
            Self::Birth { subject, mother, father, .. } => {
                let mut v = vec![*subject, *mother];
                v.extend(*father);
                v
            }
            Self::Adoption { subject, parents } => {
                let mut v = vec![*subject];
                v.extend(parents.iter().copied());
                v
            }
            Self::Death { subject, .. }
            | Self::Hiring { subject, .. }
            | Self::LayOff { subject, .. }
            | Self::Retirement { subject, .. }
            | Self::Departure { subject }
            | Self::NameChange { subject, .. } => vec![*subject],
            Self::Marriage { spouses, .. } | Self::Divorce { spouses, .. } => spouses.to_vec(),
            Self::Move { subjects, .. } => subjects.clone(),
            Self::HomePurchase { buyers, .. } => buyers.clone(),
            Self::HouseConstruction { clients, .. } => clients.clone(),
            Self::BusinessConstruction { client, .. } => vec![*client],
            Self::Demolition { .. } | Self::BusinessClosure { .. } => Vec::new(),
        }
    }
}

/// One entry of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Registry handle.
    pub id: EventId,
    /// Global order.
    pub sequence: u64,
    /// Nominal world date.
    pub date: SimDate,
    /// Fabricated backstory dated before the live clock.
    pub retcon: bool,
    /// What triggered this event.
    pub reason: Option<Cause>,
    /// Payload.
    pub kind: EventKind,
}

impl Event {
    /// Discriminant of the payload.
    #[must_use]
    pub const fn tag(&self) -> EventTag {
        self.kind.tag()
    }
}

/// The append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Append an event. The stamp's sequence number must exceed every
    /// sequence already in the log; the context's allocator guarantees it.
    pub(crate) fn push(&mut self, stamp: Stamp, reason: Option<Cause>, kind: EventKind) -> EventId {
        debug_assert!(self.events.last().is_none_or(|e| e.sequence < stamp.sequence));
        let id = EventId::next(self.events.len());
        self.events.push(Event {
            id,
            sequence: stamp.sequence,
            date: stamp.date,
            retcon: stamp.retcon,
            reason,
            kind,
        });
        id
    }

    /// Look up an event.
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id.index())
    }

    /// All events in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Events appended at or after position `from`.
    #[must_use]
    pub fn tail(&self, from: usize) -> &[Event] {
        self.events.get(from..).unwrap_or(&[])
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events whose reason is `cause`, in sequence order.
    #[must_use]
    pub fn caused_by(&self, cause: Cause) -> Vec<EventId> {
        self.events
            .iter()
            .filter(|e| e.reason == Some(cause))
            .map(|e| e.id)
            .collect()
    }

    /// Number of events with `tag`.
    #[must_use]
    pub fn count(&self, tag: EventTag) -> usize {
        self.events.iter().filter(|e| e.tag() == tag).count()
    }
}

// ---------------------------------------------------------------------------
// Causal graph export
// ---------------------------------------------------------------------------

/// A node of the causal graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalNode {
    /// Event handle.
    pub event: EventId,
    /// Global order.
    pub sequence: u64,
    /// Nominal date.
    pub date: SimDate,
    /// Retconned.
    pub retcon: bool,
    /// Kind.
    pub tag: EventTag,
}

/// A reason link: `cause` triggered `effect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalEdge {
    /// The trigger.
    pub cause: Cause,
    /// The triggered event.
    pub effect: EventId,
}

/// A record whose end is attributed to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminated {
    /// A position.
    Occupation(OccupationId),
    /// A marriage.
    Marriage(MarriageId),
}

/// A terminus link: `ended` was ended by `by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminusLink {
    /// The record that ended.
    pub ended: Terminated,
    /// The event that ended it.
    pub by: EventId,
}

/// Full causality graph: nodes, reason edges, terminus links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalGraph {
    /// Every event, in sequence order.
    pub nodes: Vec<CausalNode>,
    /// Every reason link.
    pub edges: Vec<CausalEdge>,
    /// Every terminus link.
    pub termini: Vec<TerminusLink>,
}

impl CausalGraph {
    /// Snapshot the graph of a town.
    #[must_use]
    pub fn build(town: &Town) -> Self {
        let log = town.events();
        let nodes = log
            .iter()
            .map(|e| CausalNode {
                event: e.id,
                sequence: e.sequence,
                date: e.date,
                retcon: e.retcon,
                tag: e.tag(),
            })
            .collect();
        let edges = log
            .iter()
            .filter_map(|e| e.reason.map(|cause| CausalEdge { cause, effect: e.id }))
            .collect();
        let mut termini: Vec<TerminusLink> = town
            .occupations()
            .filter_map(|o| {
                o.terminus.map(|by| TerminusLink {
                    ended: Terminated::Occupation(o.id),
                    by,
                })
            })
            .collect();
        termini.extend(town.marriages().filter_map(|m| {
            m.terminus.map(|by| TerminusLink {
                ended: Terminated::Marriage(m.id),
                by,
            })
        }));
        Self { nodes, edges, termini }
    }

    /// Effects reachable from `root` through reason links, breadth first.
    #[must_use]
    pub fn descendants(&self, root: EventId) -> Vec<EventId> {
        let mut out = Vec::new();
        let mut frontier = std::collections::VecDeque::from([root]);
        while let Some(next) = frontier.pop_front() {
            for edge in &self.edges {
                if edge.cause == Cause::Event(next) && !out.contains(&edge.effect) {
                    out.push(edge.effect);
                    frontier.push_back(edge.effect);
                }
            }
        }
        out
    }
}
