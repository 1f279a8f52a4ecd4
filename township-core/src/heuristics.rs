//! Decision heuristics — the shared top-three pick.
//!
//! Hiring, lot and home selection, and contractor selection all score their
//! candidates and hand them here. With three or more candidates the best three
//! are drawn with probabilities 60/30/10; with fewer, the best one wins.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::context::SimContext;

/// Probability of picking the best, second and third candidate.
pub const TOP_THREE_SPLIT: [f64; 3] = [0.6, 0.3, 0.1];

/// Candidates sorted best first. Ties keep their input order; NaN scores are
/// dropped.
#[must_use]
pub fn rank<T: Copy>(candidates: &[(T, f64)]) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = candidates
        .iter()
        .copied()
        .filter(|(_, score)| !score.is_nan())
        .collect();
    ranked.sort_by_key(|(_, score)| Reverse(OrderedFloat(*score)));
    ranked
}

/// Pick with a given uniform `roll` in `[0, 1)`.
#[must_use]
pub fn pick_top_three<T: Copy>(candidates: &[(T, f64)], roll: f64) -> Option<T> {
    let ranked = rank(candidates);
    if ranked.len() < 3 {
        return ranked.first().map(|(c, _)| *c);
    }
    let slot = if roll < TOP_THREE_SPLIT[0] {
        0
    } else if roll < TOP_THREE_SPLIT[0] + TOP_THREE_SPLIT[1] {
        1
    } else {
        2
    };
    Some(ranked[slot].0)
}

/// Pick from `candidates`, drawing from the context's stream only when the
/// choice is actually random.
pub fn choose<T: Copy>(candidates: &[(T, f64)], ctx: &mut SimContext) -> Option<T> {
    let valid = candidates.iter().filter(|(_, s)| !s.is_nan()).count();
    let roll = if valid >= 3 { ctx.roll() } else { 0.0 };
    pick_top_three(candidates, roll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yields_none() {
        let none: [(u8, f64); 0] = [];
        assert_eq!(pick_top_three(&none, 0.5), None);
    }

    #[test]
    fn fewer_than_three_is_deterministic_max() {
        let two = [('a', 1.0), ('b', 3.0)];
        for roll in [0.0, 0.5, 0.99] {
            assert_eq!(pick_top_three(&two, roll), Some('b'));
        }
    }

    #[test]
    fn ties_break_to_earlier_candidate() {
        let tied = [('a', 2.0), ('b', 2.0)];
        assert_eq!(pick_top_three(&tied, 0.9), Some('a'));
    }

    #[test]
    fn roll_bands_map_to_ranks() {
        let five = [('e', 0.0), ('a', 9.0), ('c', 5.0), ('b', 7.0), ('d', 1.0)];
        assert_eq!(pick_top_three(&five, 0.0), Some('a'));
        assert_eq!(pick_top_three(&five, 0.59), Some('a'));
        assert_eq!(pick_top_three(&five, 0.6), Some('b'));
        assert_eq!(pick_top_three(&five, 0.89), Some('b'));
        assert_eq!(pick_top_three(&five, 0.9), Some('c'));
        assert_eq!(pick_top_three(&five, 0.999), Some('c'));
    }

    #[test]
    fn nan_scores_are_ignored() {
        let c = [('x', f64::NAN), ('y', -1.0)];
        assert_eq!(pick_top_three(&c, 0.3), Some('y'));
    }

    #[test]
    fn negative_scores_still_rank() {
        let c = [('a', -3.0), ('b', -1.0), ('c', -2.0)];
        assert_eq!(rank(&c).iter().map(|x| x.0).collect::<String>(), "bca");
    }
}
