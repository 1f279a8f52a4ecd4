//! Affinity Model — compatibility, increments, damping, normalization.
//!
//! Pure functions over personality snapshots. Nothing here touches the
//! registry or the random stream.
//!
//! ```text
//! compatibility = (3 - (|ΔO| + |ΔE| + |ΔA|)) / 3                 ∈ [-1, 1]
//! charge_inc    = compat + w₁·owner.E + w₂·subject.A   (× reduction if sexes differ)
//! spark_inc     = other[owner.sex]·subject + own[owner.sex]·owner  (or 0, see gates)
//!
//! normalized    = clamp(±(scale / n) · |raw|^k, -100, 100)
//! ```
//!
//! Increments are stored on the relationship and scaled at application time
//! by the age-gap and job-level dampers.

use serde::{Deserialize, Serialize};

use crate::config::AffinityConfig;
use crate::types::{Attraction, Personality, Sex};

/// Bound of the normalized charge and spark scales.
pub const NORMALIZED_BOUND: f64 = 100.0;

/// The parts of an agent the affinity model reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Personality vector.
    pub personality: Personality,
    /// Sex.
    pub sex: Sex,
    /// Attraction set.
    pub attraction: Attraction,
    /// Age in completed years.
    pub age: u32,
    /// Whether the agent is an adult.
    pub adult: bool,
}

/// Gates that zero the spark increment regardless of personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparkGates {
    /// The subject is in the owner's extended family.
    pub family: bool,
    /// Age at which romantic feelings begin.
    pub romantic_age: u32,
}

/// A pair of multipliers, one for charge and one for spark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    /// Charge multiplier.
    pub charge: f64,
    /// Spark multiplier.
    pub spark: f64,
}

impl Default for Damping {
    fn default() -> Self {
        Self { charge: 1.0, spark: 1.0 }
    }
}

/// Personality compatibility in `[-1, 1]`; higher is more compatible.
#[must_use]
pub fn compatibility(a: &Personality, b: &Personality) -> f64 {
    let diff = (a.openness - b.openness).abs()
        + (a.extroversion - b.extroversion).abs()
        + (a.agreeableness - b.agreeableness).abs();
    (3.0 - diff) / 3.0
}

/// Stored charge increment of `owner` toward `subject`.
#[must_use]
pub fn charge_increment(owner: &Profile, subject: &Profile, cfg: &AffinityConfig) -> f64 {
    let base = compatibility(&owner.personality, &subject.personality)
        + cfg.owner_extroversion_weight * owner.personality.extroversion
        + cfg.subject_agreeableness_weight * subject.personality.agreeableness;
    if owner.sex == subject.sex {
        base
    } else {
        base * cfg.sex_difference_reduction
    }
}

/// Stored spark increment of `owner` toward `subject`.
#[must_use]
pub fn spark_increment(
    owner: &Profile,
    subject: &Profile,
    gates: SparkGates,
    cfg: &AffinityConfig,
) -> f64 {
    if gates.family
        || !owner.attraction.includes(subject.sex)
        || owner.age < gates.romantic_age
        || (owner.adult && !subject.adult)
    {
        return 0.0;
    }
    cfg.spark_from_other.for_sex(owner.sex).apply(&subject.personality)
        + cfg.spark_from_self.for_sex(owner.sex).apply(&owner.personality)
}

/// Dampers from the absolute age gap.
#[must_use]
pub fn age_damping(owner_age: u32, subject_age: u32, cfg: &AffinityConfig) -> Damping {
    let gap = (f64::from(owner_age).sqrt() - f64::from(subject_age).sqrt()).abs();
    Damping {
        charge: (1.0 - gap / cfg.age_charge_divisor).max(cfg.age_charge_floor),
        spark: (1.0 - gap / cfg.age_spark_divisor).max(cfg.age_spark_floor),
    }
}

/// Dampers from the job-level gap.
#[must_use]
pub fn job_level_damping(owner_level: f64, subject_level: f64, cfg: &AffinityConfig) -> Damping {
    let gap = (owner_level.max(0.0).sqrt() - subject_level.max(0.0).sqrt()).abs();
    Damping {
        charge: (1.0 - gap).max(cfg.job_charge_floor),
        spark: (1.0 - gap).max(cfg.job_spark_floor),
    }
}

/// Map raw charge onto the `[-100, 100]` display scale.
///
/// `steps` is the number of elapsed timesteps (at least 1). Sign is preserved
/// exactly: zero maps to zero and the result is never rounded.
#[must_use]
pub fn normalize_charge(raw: f64, steps: f64, cfg: &AffinityConfig) -> f64 {
    let factor = cfg.normalization_scale / steps.max(1.0);
    let value = if raw >= 0.0 {
        factor * raw.powf(cfg.charge_positive_exponent)
    } else {
        -factor * raw.abs().powf(cfg.charge_negative_exponent)
    };
    value.clamp(-NORMALIZED_BOUND, NORMALIZED_BOUND)
}

/// Map raw spark onto the `[-100, 100]` display scale.
#[must_use]
pub fn normalize_spark(raw: f64, steps: f64, cfg: &AffinityConfig) -> f64 {
    let factor = cfg.normalization_scale / steps.max(1.0);
    let magnitude = factor * raw.abs().powf(cfg.spark_exponent);
    magnitude.copysign(raw).clamp(-NORMALIZED_BOUND, NORMALIZED_BOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile(sex: Sex, age: u32, p: Personality) -> Profile {
        Profile {
            personality: p,
            sex,
            attraction: Attraction::heterosexual(sex),
            age,
            adult: age >= 18,
        }
    }

    fn no_gates() -> SparkGates {
        SparkGates { family: false, romantic_age: 13 }
    }

    #[test]
    fn identical_personalities_are_fully_compatible() {
        let p = Personality::new(0.3, -0.2, 0.7, 0.1, 0.0);
        assert!((compatibility(&p, &p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_personalities_are_fully_incompatible() {
        let a = Personality::new(1.0, 0.0, 1.0, 1.0, 0.0);
        let b = Personality::new(-1.0, 0.0, -1.0, -1.0, 0.0);
        assert!((compatibility(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn charge_increment_is_asymmetric_in_extroversion() {
        let cfg = AffinityConfig::default();
        let a = make_profile(Sex::Female, 30, Personality::new(0.0, 0.0, 0.9, 0.5, 0.0));
        let b = make_profile(Sex::Female, 30, Personality::new(0.0, 0.0, -0.9, 0.5, 0.0));
        let ab = charge_increment(&a, &b, &cfg);
        let ba = charge_increment(&b, &a, &cfg);
        assert!((ab - 0.75).abs() < 1e-12);
        assert!((ba - 0.30).abs() < 1e-12);
    }

    #[test]
    fn different_sexes_reduce_charge() {
        let cfg = AffinityConfig::default();
        let p = Personality::new(0.0, 0.0, 0.4, 0.4, 0.0);
        let a = make_profile(Sex::Male, 30, p);
        let b_same = make_profile(Sex::Male, 30, p);
        let b_diff = make_profile(Sex::Female, 30, p);
        let same = charge_increment(&a, &b_same, &cfg);
        let diff = charge_increment(&a, &b_diff, &cfg);
        assert!((diff - same * cfg.sex_difference_reduction).abs() < 1e-12);
    }

    #[test]
    fn spark_gates_zero_the_increment() {
        let cfg = AffinityConfig::default();
        let p = Personality::new(0.5, 0.5, 0.5, 0.5, -0.5);
        let man = make_profile(Sex::Male, 25, p);
        let woman = make_profile(Sex::Female, 25, p);
        let other_man = make_profile(Sex::Male, 25, p);
        let girl = make_profile(Sex::Female, 15, p);
        let boy = make_profile(Sex::Male, 12, p);

        assert!(spark_increment(&man, &woman, no_gates(), &cfg) != 0.0);
        assert!(spark_increment(&man, &other_man, no_gates(), &cfg).abs() < f64::EPSILON);
        assert!(spark_increment(&man, &girl, no_gates(), &cfg).abs() < f64::EPSILON);
        assert!(spark_increment(&boy, &woman, no_gates(), &cfg).abs() < f64::EPSILON);
        let family = SparkGates { family: true, romantic_age: 13 };
        assert!(spark_increment(&man, &woman, family, &cfg).abs() < f64::EPSILON);
    }

    #[test]
    fn spark_uses_owner_sex_weights() {
        let cfg = AffinityConfig::default();
        let p = Personality::new(0.2, 0.4, 0.6, 0.8, -0.2);
        let man = make_profile(Sex::Male, 25, p);
        let woman = make_profile(Sex::Female, 25, p);
        let expected = cfg.spark_from_other.male.apply(&p) + cfg.spark_from_self.male.apply(&p);
        assert!((spark_increment(&man, &woman, no_gates(), &cfg) - expected).abs() < 1e-12);
    }

    #[test]
    fn same_age_is_undamped_and_large_gaps_hit_floors() {
        let cfg = AffinityConfig::default();
        let same = age_damping(40, 40, &cfg);
        assert!((same.charge - 1.0).abs() < f64::EPSILON);
        assert!((same.spark - 1.0).abs() < f64::EPSILON);
        let far = age_damping(0, 100, &cfg);
        assert!((far.charge - 0.05).abs() < 1e-12);
        assert!((far.spark - 0.01).abs() < 1e-12);
    }

    #[test]
    fn job_damping_shrinks_with_level_gap() {
        let cfg = AffinityConfig::default();
        let close = job_level_damping(1.0, 1.0, &cfg);
        let far = job_level_damping(0.1, 5.0, &cfg);
        assert!(close.charge > far.charge);
        assert!(far.charge >= cfg.job_charge_floor);
    }

    #[test]
    fn normalization_preserves_sign_and_bounds() {
        let cfg = AffinityConfig::default();
        for raw in [-1e9, -3.0, -1e-9, 0.0, 1e-9, 2.5, 1e9] {
            for steps in [1.0, 10.0, 1e6] {
                let c = normalize_charge(raw, steps, &cfg);
                let s = normalize_spark(raw, steps, &cfg);
                assert!((-100.0..=100.0).contains(&c));
                assert!((-100.0..=100.0).contains(&s));
                assert_eq!(c == 0.0, raw == 0.0, "charge raw={raw} steps={steps}");
                assert_eq!(s == 0.0, raw == 0.0, "spark raw={raw} steps={steps}");
                if raw != 0.0 {
                    assert_eq!(c > 0.0, raw > 0.0);
                    assert_eq!(s > 0.0, raw > 0.0);
                }
            }
        }
    }

    #[test]
    fn more_elapsed_time_shrinks_the_view() {
        let cfg = AffinityConfig::default();
        assert!(normalize_charge(4.0, 100.0, &cfg) < normalize_charge(4.0, 10.0, &cfg));
    }
}
