//! Salience Ledger — how notable each other agent is to an agent.
//!
//! A flat map from counterpart to a non-negative score. Every relationship
//! change, interaction and event nudges it; values never drop below zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SalienceConfig;
use crate::types::AgentId;

/// Per-agent salience map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Salience {
    values: BTreeMap<AgentId, f64>,
}

impl Salience {
    /// Salience of `other`; zero if never adjusted.
    #[must_use]
    pub fn of(&self, other: AgentId) -> f64 {
        self.values.get(&other).copied().unwrap_or(0.0)
    }

    /// Add `delta` to the salience of `other`, flooring at zero. Returns the
    /// new value.
    pub fn adjust(&mut self, other: AgentId, delta: f64) -> f64 {
        let entry = self.values.entry(other).or_insert(0.0);
        *entry = (*entry + delta).max(0.0);
        *entry
    }

    /// Iterate over `(agent, salience)` pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// The `n` most salient agents, highest first (ties by handle).
    #[must_use]
    pub fn most_salient(&self, n: usize) -> Vec<(AgentId, f64)> {
        let mut all: Vec<_> = self.iter().collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no agent is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Relationship-change categories that carry a salience weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalienceChange {
    /// First meeting.
    Acquaintance,
    /// Stopped being a neighbor.
    FormerNeighbor,
    /// Stopped being a coworker.
    FormerCoworker,
    /// Became a neighbor.
    Neighbor,
    /// Became a coworker.
    Coworker,
    /// Newborn descendant.
    Descendant,
    /// Newborn's ancestor.
    Ancestor,
    /// Extended family.
    ExtendedFamily,
    /// Friendship formed.
    Friend,
    /// Enmity formed.
    Enemy,
    /// Immediate family.
    ImmediateFamily,
    /// Love-interest pointer.
    LoveInterest,
    /// Best-friend pointer.
    BestFriend,
    /// Worst-enemy pointer.
    WorstEnemy,
    /// Significant-other pointer.
    SignificantOther,
}

impl SalienceChange {
    /// Configured weight of this change.
    #[must_use]
    pub const fn weight(self, cfg: &SalienceConfig) -> f64 {
        match self {
            Self::Acquaintance => cfg.acquaintance,
            Self::FormerNeighbor => cfg.former_neighbor,
            Self::FormerCoworker => cfg.former_coworker,
            Self::Neighbor => cfg.neighbor,
            Self::Coworker => cfg.coworker,
            Self::Descendant => cfg.descendant,
            Self::Ancestor => cfg.ancestor,
            Self::ExtendedFamily => cfg.extended_family,
            Self::Friend => cfg.friend,
            Self::Enemy => cfg.enemy,
            Self::ImmediateFamily => cfg.immediate_family,
            Self::LoveInterest => cfg.love_interest,
            Self::BestFriend => cfg.best_friend,
            Self::WorstEnemy => cfg.worst_enemy,
            Self::SignificantOther => cfg.significant_other,
        }
    }

    /// Net delta when moving from category `from` to category `to`.
    #[must_use]
    pub fn transition(from: Self, to: Self, cfg: &SalienceConfig) -> f64 {
        to.weight(cfg) - from.weight(cfg)
    }
}

/// Boost every resident applies toward someone who takes a job of `level`.
#[must_use]
pub fn job_level_boost(level: f64, cfg: &SalienceConfig) -> f64 {
    level * cfg.job_level_multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_agents_have_zero_salience() {
        let s = Salience::default();
        assert!(s.of(AgentId(3)).abs() < f64::EPSILON);
        assert!(s.is_empty());
    }

    #[test]
    fn salience_floors_at_zero() {
        let mut s = Salience::default();
        s.adjust(AgentId(1), 0.5);
        assert!((s.adjust(AgentId(1), -2.0)).abs() < f64::EPSILON);
        assert!((s.adjust(AgentId(1), 1.25) - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn most_salient_orders_by_value_then_handle() {
        let mut s = Salience::default();
        s.adjust(AgentId(4), 2.0);
        s.adjust(AgentId(2), 5.0);
        s.adjust(AgentId(1), 2.0);
        let top = s.most_salient(2);
        assert_eq!(top[0].0, AgentId(2));
        assert_eq!(top[1].0, AgentId(1));
    }

    #[test]
    fn neighbor_to_former_neighbor_is_a_net_loss() {
        let cfg = SalienceConfig::default();
        let delta =
            SalienceChange::transition(SalienceChange::Neighbor, SalienceChange::FormerNeighbor, &cfg);
        assert!((delta + 0.5).abs() < 1e-12);
    }

    #[test]
    fn job_level_boost_scales_with_level() {
        let cfg = SalienceConfig::default();
        assert!((job_level_boost(4.0, &cfg) - 1.4).abs() < 1e-12);
    }
}
