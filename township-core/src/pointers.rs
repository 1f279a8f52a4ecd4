//! Social pointer maintenance.
//!
//! After every progression step the owner's best-friend, worst-enemy and
//! love-interest slots are compared against the subject's fresh raw values.
//! Each slot caches the metric that put its holder there; displacing a
//! holder moves the slot's salience weight from the old holder to the new.
//! The significant-other slot is written only by marriage, divorce and death.

use crate::agent::SocialPointer;
use crate::config::SalienceConfig;
use crate::error::Result;
use crate::relationship;
use crate::salience::Salience;
use crate::town::Town;
use crate::types::AgentId;

/// Which way a slot's metric must point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    /// Larger positive values win.
    High,
    /// More negative values win.
    Low,
}

impl Polarity {
    fn qualifies(self, value: f64) -> bool {
        match self {
            Self::High => value > 0.0,
            Self::Low => value < 0.0,
        }
    }

    /// A current holder keeps the slot until the value crosses to the
    /// wrong side of zero.
    fn retains(self, value: f64) -> bool {
        match self {
            Self::High => value >= 0.0,
            Self::Low => value <= 0.0,
        }
    }

    fn beats(self, value: f64, extremum: f64) -> bool {
        match self {
            Self::High => value > extremum,
            Self::Low => value < extremum,
        }
    }
}

fn update_slot(
    slot: &mut SocialPointer,
    salience: &mut Salience,
    subject: AgentId,
    value: f64,
    polarity: Polarity,
    weight: f64,
) {
    if slot.holder == Some(subject) {
        if polarity.retains(value) {
            slot.extremum = value;
        } else {
            slot.clear();
            salience.adjust(subject, -weight);
        }
        return;
    }
    if !polarity.qualifies(value) {
        return;
    }
    if slot.holder.is_none() || polarity.beats(value, slot.extremum) {
        if let Some(previous) = slot.holder {
            salience.adjust(previous, -weight);
        }
        slot.holder = Some(subject);
        slot.extremum = value;
        salience.adjust(subject, weight);
    }
}

/// Compare `owner`'s pointer slots against `subject`'s fresh raw values.
///
/// # Errors
/// Returns `TownError::AgentNotFound` for an unknown owner.
pub fn scan(
    town: &mut Town,
    cfg: &SalienceConfig,
    owner: AgentId,
    subject: AgentId,
    raw_charge: f64,
    raw_spark: f64,
) -> Result<()> {
    let agent = town.agent_mut(owner)?;
    let pointers = &mut agent.pointers;
    let salience = &mut agent.salience;
    update_slot(&mut pointers.best_friend, salience, subject, raw_charge, Polarity::High, cfg.best_friend);
    update_slot(&mut pointers.worst_enemy, salience, subject, raw_charge, Polarity::Low, cfg.worst_enemy);
    update_slot(&mut pointers.love_interest, salience, subject, raw_spark, Polarity::High, cfg.love_interest);
    Ok(())
}

/// Rebuild `agent`'s love-interest slot from scratch: the current record with
/// the highest positive raw spark, if any. Used after raw sparks are reset.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn recompute_love_interest(town: &mut Town, cfg: &SalienceConfig, agent: AgentId) -> Result<()> {
    let mut best: Option<(AgentId, f64)> = None;
    for (subject, id) in &town.agent(agent)?.ledger {
        let spark = town.relationship(*id)?.raw_spark;
        if spark > 0.0 && best.is_none_or(|(_, b)| spark > b) {
            best = Some((*subject, spark));
        }
    }
    let a = town.agent_mut(agent)?;
    let previous = a.pointers.love_interest.holder;
    if previous == best.map(|(s, _)| s) {
        a.pointers.love_interest.extremum = best.map_or(0.0, |(_, v)| v);
        return Ok(());
    }
    if let Some(p) = previous {
        a.salience.adjust(p, -cfg.love_interest);
    }
    a.pointers.love_interest.clear();
    if let Some((subject, spark)) = best {
        a.pointers.love_interest.holder = Some(subject);
        a.pointers.love_interest.extremum = spark;
        a.salience.adjust(subject, cfg.love_interest);
    }
    Ok(())
}

/// Whether `owner` and `subject` hold each other's love-interest slot.
///
/// # Errors
/// Returns an unknown-handle error.
pub fn mutual_love_interest(town: &Town, owner: AgentId, subject: AgentId) -> Result<bool> {
    Ok(town.agent(owner)?.love_interest() == Some(subject)
        && town.agent(subject)?.love_interest() == Some(owner))
}

/// Current normalized spark of owner toward subject (0 if they never met).
///
/// # Errors
/// Returns an unknown-handle error.
pub fn spark_toward(town: &Town, owner: AgentId, subject: AgentId) -> Result<f64> {
    match relationship::current(town, owner, subject)? {
        Some(id) => Ok(town.relationship(id)?.spark),
        None => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight() -> f64 {
        1.0
    }

    #[test]
    fn first_positive_value_installs_holder() {
        let mut slot = SocialPointer::default();
        let mut sal = Salience::default();
        update_slot(&mut slot, &mut sal, AgentId(1), 3.0, Polarity::High, weight());
        assert_eq!(slot.holder, Some(AgentId(1)));
        assert!((sal.of(AgentId(1)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn higher_value_displaces_holder_and_moves_salience() {
        let mut slot = SocialPointer::default();
        let mut sal = Salience::default();
        update_slot(&mut slot, &mut sal, AgentId(1), 3.0, Polarity::High, weight());
        update_slot(&mut slot, &mut sal, AgentId(2), 2.0, Polarity::High, weight());
        assert_eq!(slot.holder, Some(AgentId(1)));
        update_slot(&mut slot, &mut sal, AgentId(2), 4.0, Polarity::High, weight());
        assert_eq!(slot.holder, Some(AgentId(2)));
        assert!(sal.of(AgentId(1)).abs() < f64::EPSILON);
        assert!((sal.of(AgentId(2)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn holder_regressing_past_zero_clears_slot() {
        let mut slot = SocialPointer::default();
        let mut sal = Salience::default();
        update_slot(&mut slot, &mut sal, AgentId(1), -2.0, Polarity::Low, weight());
        assert_eq!(slot.holder, Some(AgentId(1)));
        update_slot(&mut slot, &mut sal, AgentId(1), -1.0, Polarity::Low, weight());
        assert!((slot.extremum + 1.0).abs() < f64::EPSILON);
        update_slot(&mut slot, &mut sal, AgentId(1), 0.5, Polarity::Low, weight());
        assert_eq!(slot.holder, None);
        assert!(sal.of(AgentId(1)).abs() < f64::EPSILON);
    }

    #[test]
    fn holder_resting_at_zero_keeps_slot() {
        let mut slot = SocialPointer::default();
        let mut sal = Salience::default();
        update_slot(&mut slot, &mut sal, AgentId(1), 2.0, Polarity::High, weight());
        update_slot(&mut slot, &mut sal, AgentId(1), 0.0, Polarity::High, weight());
        assert_eq!(slot.holder, Some(AgentId(1)));
        assert!(slot.extremum.abs() < f64::EPSILON);
        assert!((sal.of(AgentId(1)) - 1.0).abs() < f64::EPSILON);

        let mut enemy = SocialPointer::default();
        update_slot(&mut enemy, &mut sal, AgentId(2), -2.0, Polarity::Low, weight());
        update_slot(&mut enemy, &mut sal, AgentId(2), 0.0, Polarity::Low, weight());
        assert_eq!(enemy.holder, Some(AgentId(2)));
        update_slot(&mut enemy, &mut sal, AgentId(2), 0.1, Polarity::Low, weight());
        assert_eq!(enemy.holder, None);
    }

    #[test]
    fn wrong_sign_never_installs() {
        let mut slot = SocialPointer::default();
        let mut sal = Salience::default();
        update_slot(&mut slot, &mut sal, AgentId(1), -5.0, Polarity::High, weight());
        update_slot(&mut slot, &mut sal, AgentId(1), 0.0, Polarity::High, weight());
        assert_eq!(slot.holder, None);
        assert!(sal.is_empty());
    }
}
