//! Configuration for the township simulation.
//!
//! Maps directly to `township.toml`. Every section carries its defaults, so an
//! empty file is a complete configuration.

use serde::{Deserialize, Serialize};

use crate::types::{Personality, Sex};

/// Top-level township configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct TownConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Affinity model constants.
    #[serde(default)]
    pub affinity: AffinityConfig,
    /// Relationship category thresholds.
    #[serde(default)]
    pub relationships: RelationshipConfig,
    /// Salience values per relationship change.
    #[serde(default)]
    pub salience: SalienceConfig,
    /// Chance-of-interaction shaping.
    #[serde(default)]
    pub socializing: SocializingConfig,
    /// Hiring candidate scoring.
    #[serde(default)]
    pub hiring: HiringConfig,
    /// Contractor (architect, lawyer, realtor, ...) scoring.
    #[serde(default)]
    pub contracting: ContractingConfig,
    /// Lot and home desirability.
    #[serde(default)]
    pub housing: HousingConfig,
    /// Marriage and divorce probabilities.
    #[serde(default)]
    pub marriage: MarriageConfig,
    /// Outsider generation and retconned backstory.
    #[serde(default)]
    pub outsiders: OutsiderConfig,
    /// Age milestones.
    #[serde(default)]
    pub life_cycle: LifeCycleConfig,
}

impl TownConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TownError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::TownError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject internally inconsistent values.
    ///
    /// # Errors
    /// Returns `TownError::Config` naming the first offending key.
    pub fn validate(&self) -> crate::error::Result<()> {
        let r = &self.relationships;
        if r.friendship_threshold <= r.enmity_threshold {
            return Err(config_error(
                "relationships.friendship_threshold must exceed relationships.enmity_threshold",
            ));
        }

        let a = &self.affinity;
        for (key, value) in [
            ("affinity.charge_positive_exponent", a.charge_positive_exponent),
            ("affinity.charge_negative_exponent", a.charge_negative_exponent),
            ("affinity.spark_exponent", a.spark_exponent),
            ("affinity.normalization_scale", a.normalization_scale),
            ("affinity.age_charge_divisor", a.age_charge_divisor),
            ("affinity.age_spark_divisor", a.age_spark_divisor),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(config_error(&format!("{key} must be positive, got {value}")));
            }
        }
        if !(0.0..1.0).contains(&a.spark_decay_rate) {
            return Err(config_error("affinity.spark_decay_rate must lie in [0, 1)"));
        }

        let m = &self.marriage;
        for (key, p) in [
            ("marriage.name_change", m.name_change),
            ("marriage.stepchild_name_change", m.stepchild_name_change),
            ("marriage.hyphenate_children", m.hyphenate_children),
            ("marriage.fall_out_of_love", m.fall_out_of_love),
            ("marriage.male_moves_out", m.male_moves_out),
            ("marriage.name_reversion_cap", m.name_reversion_cap),
            ("outsiders.conception_chance", self.outsiders.conception_chance),
            ("housing.build_penalty", self.housing.build_penalty),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(config_error(&format!("{key} must lie in [0, 1], got {p}")));
            }
        }

        if self.outsiders.marriage_age_sd < 0.0 {
            return Err(config_error("outsiders.marriage_age_sd must not be negative"));
        }
        if self.life_cycle.romantic_age > self.life_cycle.adult_age {
            return Err(config_error(
                "life_cycle.romantic_age must not exceed life_cycle.adult_age",
            ));
        }
        Ok(())
    }
}

fn config_error(msg: &str) -> crate::TownError {
    crate::TownError::Config(msg.to_string())
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seed for the single pseudo-random stream.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Year the live simulation clock starts in.
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    /// Name given to the town.
    #[serde(default = "default_town_name")]
    pub town_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            log_level: default_log_level(),
            first_year: default_first_year(),
            town_name: default_town_name(),
        }
    }
}

/// Per-trait coefficients for one half of the spark weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitWeights {
    /// Openness coefficient.
    pub openness: f64,
    /// Conscientiousness coefficient.
    pub conscientiousness: f64,
    /// Extroversion coefficient.
    pub extroversion: f64,
    /// Agreeableness coefficient.
    pub agreeableness: f64,
    /// Neuroticism coefficient.
    pub neuroticism: f64,
}

impl TraitWeights {
    /// Weighted sum of a personality's traits.
    #[must_use]
    pub fn apply(&self, p: &Personality) -> f64 {
        self.openness * p.openness
            + self.conscientiousness * p.conscientiousness
            + self.extroversion * p.extroversion
            + self.agreeableness * p.agreeableness
            + self.neuroticism * p.neuroticism
    }
}

/// Spark coefficients keyed by the sex of the agent doing the feeling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparkWeights {
    /// Coefficients when the owner is male.
    pub male: TraitWeights,
    /// Coefficients when the owner is female.
    pub female: TraitWeights,
}

impl SparkWeights {
    /// Coefficients for an owner of `sex`.
    #[must_use]
    pub const fn for_sex(&self, sex: Sex) -> &TraitWeights {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

/// Affinity model constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityConfig {
    /// Weight of the owner's own extroversion in the charge increment.
    pub owner_extroversion_weight: f64,
    /// Weight of the subject's agreeableness in the charge increment.
    pub subject_agreeableness_weight: f64,
    /// Charge increment multiplier for pairs of different sexes.
    pub sex_difference_reduction: f64,
    /// Geometric decay applied to the stored spark increment on each interaction.
    pub spark_decay_rate: f64,
    /// Numerator of the `scale / timesteps` normalization factor.
    pub normalization_scale: f64,
    /// Power-law exponent for non-negative raw charge.
    pub charge_positive_exponent: f64,
    /// Power-law exponent for negative raw charge.
    pub charge_negative_exponent: f64,
    /// Power-law exponent for raw spark (either sign).
    pub spark_exponent: f64,
    /// Divisor of the square-root age gap for charge damping.
    pub age_charge_divisor: f64,
    /// Floor of charge age damping.
    pub age_charge_floor: f64,
    /// Divisor of the square-root age gap for spark damping.
    pub age_spark_divisor: f64,
    /// Floor of spark age damping.
    pub age_spark_floor: f64,
    /// Floor of charge job-level damping.
    pub job_charge_floor: f64,
    /// Floor of spark job-level damping.
    pub job_spark_floor: f64,
    /// Effect of the subject's personality on the owner's spark.
    pub spark_from_other: SparkWeights,
    /// Effect of the owner's own personality on the owner's spark.
    pub spark_from_self: SparkWeights,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            owner_extroversion_weight: 0.25,
            subject_agreeableness_weight: 0.25,
            sex_difference_reduction: 0.5,
            spark_decay_rate: 0.8,
            normalization_scale: 500.0,
            charge_positive_exponent: 0.568,
            charge_negative_exponent: 0.73,
            spark_exponent: 0.765,
            age_charge_divisor: 4.5,
            age_charge_floor: 0.05,
            age_spark_divisor: 1.5,
            age_spark_floor: 0.01,
            job_charge_floor: 0.05,
            job_spark_floor: 0.05,
            spark_from_other: SparkWeights {
                male: TraitWeights {
                    openness: -0.39,
                    conscientiousness: 0.50,
                    extroversion: 0.50,
                    agreeableness: 0.52,
                    neuroticism: -0.36,
                },
                female: TraitWeights {
                    openness: -0.37,
                    conscientiousness: 0.38,
                    extroversion: 0.49,
                    agreeableness: 0.31,
                    neuroticism: -0.63,
                },
            },
            spark_from_self: SparkWeights {
                male: TraitWeights {
                    openness: 0.20,
                    conscientiousness: -0.09,
                    extroversion: 0.13,
                    agreeableness: 0.30,
                    neuroticism: 0.01,
                },
                female: TraitWeights {
                    openness: 0.55,
                    conscientiousness: -0.10,
                    extroversion: 0.43,
                    agreeableness: 0.19,
                    neuroticism: 0.05,
                },
            },
        }
    }
}

/// Relationship category thresholds on normalized charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Acquaintance becomes Friendship above this charge.
    pub friendship_threshold: f64,
    /// Acquaintance becomes Enmity below this charge.
    pub enmity_threshold: f64,
    /// `likes` holds above this charge.
    pub like_threshold: f64,
    /// `dislikes` holds below this charge.
    pub dislike_threshold: f64,
    /// `hates` holds below this charge.
    pub hate_threshold: f64,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            friendship_threshold: 15.0,
            enmity_threshold: -10.0,
            like_threshold: 10.0,
            dislike_threshold: -8.0,
            hate_threshold: -20.0,
        }
    }
}

/// Salience increments, one per kind of relationship change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalienceConfig {
    /// Every interaction.
    pub interaction: f64,
    /// Meeting someone.
    pub acquaintance: f64,
    /// Someone stops being a neighbor.
    pub former_neighbor: f64,
    /// Someone stops being a coworker.
    pub former_coworker: f64,
    /// Someone becomes a neighbor.
    pub neighbor: f64,
    /// Someone becomes a coworker.
    pub coworker: f64,
    /// A newborn's view of a descendant (and vice versa).
    pub descendant: f64,
    /// A newborn's view of an ancestor.
    pub ancestor: f64,
    /// Extended family membership.
    pub extended_family: f64,
    /// A friendship forms.
    pub friend: f64,
    /// An enmity forms.
    pub enemy: f64,
    /// Immediate family membership.
    pub immediate_family: f64,
    /// Love-interest pointer.
    pub love_interest: f64,
    /// Best-friend pointer.
    pub best_friend: f64,
    /// Worst-enemy pointer.
    pub worst_enemy: f64,
    /// Significant-other pointer.
    pub significant_other: f64,
    /// Residents' boost toward a job holder, per job level.
    pub job_level_multiplier: f64,
}

impl Default for SalienceConfig {
    fn default() -> Self {
        Self {
            interaction: 0.1,
            acquaintance: 0.5,
            former_neighbor: 0.75,
            former_coworker: 1.0,
            neighbor: 1.25,
            coworker: 1.5,
            descendant: 1.5,
            ancestor: 1.5,
            extended_family: 1.5,
            friend: 2.0,
            enemy: 2.0,
            immediate_family: 2.0,
            love_interest: 3.0,
            best_friend: 1.0,
            worst_enemy: 1.0,
            significant_other: 5.0,
            job_level_multiplier: 0.35,
        }
    }
}

/// Chance-of-interaction shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocializingConfig {
    /// Agents younger than this are never chosen as interlocutors.
    pub min_age: u32,
    /// Clamp range for the extroversion term.
    pub extroversion_floor: f64,
    /// Clamp range for the extroversion term.
    pub extroversion_cap: f64,
    /// Clamp range for the openness term (strangers only).
    pub openness_floor: f64,
    /// Clamp range for the openness term (strangers only).
    pub openness_cap: f64,
    /// Bonus when the other is a friend.
    pub friend_bonus: f64,
    /// Additional bonus when the other is the best friend.
    pub best_friend_bonus: f64,
    /// Final clamp floor.
    pub chance_floor: f64,
    /// Final clamp cap.
    pub chance_cap: f64,
}

impl Default for SocializingConfig {
    fn default() -> Self {
        Self {
            min_age: 5,
            extroversion_floor: 0.05,
            extroversion_cap: 0.7,
            openness_floor: 0.01,
            openness_cap: 0.7,
            friend_bonus: 0.5,
            best_friend_bonus: 0.2,
            chance_floor: 0.05,
            chance_cap: 0.95,
        }
    }
}

/// Hiring candidate scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HiringConfig {
    /// Candidate already works at the hiring company.
    pub within_company: f64,
    /// Candidate is immediate family of the decision maker.
    pub decision_maker_immediate_family: f64,
    /// Candidate is extended family of the decision maker.
    pub decision_maker_extended_family: f64,
    /// Candidate has immediate family employed at the company.
    pub employee_immediate_family: f64,
    /// Candidate has extended family employed at the company.
    pub employee_extended_family: f64,
    /// Candidate is a friend of the decision maker.
    pub friend: f64,
    /// Candidate is an acquaintance of the decision maker.
    pub acquaintance: f64,
    /// Candidate is an enemy of the decision maker.
    pub enemy: f64,
    /// Multiplier for candidates without a current job.
    pub unemployed_multiplier: f64,
    /// Years a candidate must have held their current job.
    pub min_years_in_current_job: f64,
}

impl Default for HiringConfig {
    fn default() -> Self {
        Self {
            within_company: 5.0,
            decision_maker_immediate_family: 15.0,
            decision_maker_extended_family: 7.0,
            employee_immediate_family: 3.0,
            employee_extended_family: 2.0,
            friend: 4.0,
            acquaintance: 0.5,
            enemy: -1.0,
            unemployed_multiplier: 0.5,
            min_years_in_current_job: 1.0,
        }
    }
}

/// Contractor scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractingConfig {
    /// Contractor is immediate family of the client.
    pub immediate_family: f64,
    /// Contractor is extended family of the client.
    pub extended_family: f64,
    /// Contractor is a friend of the client.
    pub friend: f64,
    /// Contractor is an acquaintance of the client.
    pub acquaintance: f64,
    /// Contractor is an enemy of the client.
    pub enemy: f64,
    /// Client has used this contractor before.
    pub former_contractor: f64,
    /// Exponent on years of experience.
    pub experience_exponent: f64,
}

impl Default for ContractingConfig {
    fn default() -> Self {
        Self {
            immediate_family: 9.0,
            extended_family: 1.0,
            friend: 2.0,
            acquaintance: 0.5,
            enemy: -2.0,
            former_contractor: 2.0,
            experience_exponent: 0.2,
        }
    }
}

/// Lot and home desirability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingConfig {
    /// Base desire to live near family, before personality.
    pub desire_base: f64,
    /// Lower clamp of the family desire.
    pub desire_floor: f64,
    /// Upper clamp of the family desire.
    pub desire_cap: f64,
    /// Pull of a kid's home.
    pub pull_kid: f64,
    /// Pull of a parent's home.
    pub pull_parent: f64,
    /// Pull of a grandkid's home.
    pub pull_grandkid: f64,
    /// Pull of a sibling's home.
    pub pull_sibling: f64,
    /// Pull of a grandparent's home.
    pub pull_grandparent: f64,
    /// Pull of any other relative's home.
    pub pull_other_kin: f64,
    /// Pull of a friend's home.
    pub pull_friend: f64,
    /// Pull of the workplace.
    pub pull_workplace: f64,
    /// Multiplier on vacant-lot scores (building is less attractive than buying).
    pub build_penalty: f64,
}

impl Default for HousingConfig {
    fn default() -> Self {
        Self {
            desire_base: 0.3,
            desire_floor: -2.0,
            desire_cap: 2.0,
            pull_kid: 7.0,
            pull_parent: 5.0,
            pull_grandkid: 3.0,
            pull_sibling: 2.0,
            pull_grandparent: 2.0,
            pull_other_kin: 1.0,
            pull_friend: 1.5,
            pull_workplace: 5.0,
            build_penalty: 0.1,
        }
    }
}

/// Marriage and divorce probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarriageConfig {
    /// A spouse takes the other's surname.
    pub name_change: f64,
    /// A young stepchild takes the new surname.
    pub stepchild_name_change: f64,
    /// Oldest stepchild age eligible for a name change.
    pub stepchild_name_max_age: u32,
    /// The couple will hyphenate their children's names.
    pub hyphenate_children: f64,
    /// Each spouse falls out of love on divorce.
    pub fall_out_of_love: f64,
    /// Raw spark assigned to someone who fell out of love.
    pub fallen_out_raw_spark: f64,
    /// The male spouse moves out on divorce.
    pub male_moves_out: f64,
    /// Maximum chance of reverting to a former surname.
    pub name_reversion_cap: f64,
}

impl Default for MarriageConfig {
    fn default() -> Self {
        Self {
            name_change: 0.9,
            stepchild_name_change: 0.3,
            stepchild_name_max_age: 6,
            hyphenate_children: 0.4,
            fall_out_of_love: 0.9,
            fallen_out_raw_spark: -500.0,
            male_moves_out: 0.7,
            name_reversion_cap: 0.9,
        }
    }
}

/// Outsider generation and retconned family backstory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutsiderConfig {
    /// Base age of an outsider before level-scaled experience.
    pub min_age: u32,
    /// Money an outsider arrives with.
    pub starting_money: f64,
    /// Population at which outsiders stop arriving with families.
    pub family_population_pivot: f64,
    /// Divisor turning `(pivot - population)` into a probability.
    pub family_chance_divisor: f64,
    /// Mean age at a retconned marriage.
    pub marriage_age_mean: f64,
    /// Standard deviation of age at a retconned marriage.
    pub marriage_age_sd: f64,
    /// Youngest plausible age at a retconned marriage.
    pub min_marriage_age: u32,
    /// Per-year chance of a retconned birth is `conception_chance / (kids + 1)`.
    pub conception_chance: f64,
}

impl Default for OutsiderConfig {
    fn default() -> Self {
        Self {
            min_age: 18,
            starting_money: 5000.0,
            family_population_pivot: 200.0,
            family_chance_divisor: 1000.0,
            marriage_age_mean: 23.0,
            marriage_age_sd: 2.7,
            min_marriage_age: 17,
            conception_chance: 0.4,
        }
    }
}

/// Age milestones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeCycleConfig {
    /// Age romantic feelings begin.
    pub romantic_age: u32,
    /// Age of adulthood.
    pub adult_age: u32,
    /// Age an agent joins the workforce.
    pub working_age: u32,
    /// Uniform noise added to the mean of the parents' traits at birth.
    pub inherited_personality_noise: f64,
    /// Birthdays at which age damping is recomputed.
    pub damping_milestones: Vec<u32>,
}

impl Default for LifeCycleConfig {
    fn default() -> Self {
        Self {
            romantic_age: 13,
            adult_age: 18,
            working_age: 16,
            inherited_personality_noise: 0.3,
            damping_milestones: vec![
                1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 14, 16, 18, 20, 23, 26, 29, 33, 37, 41, 45, 50,
                55, 60, 65, 70, 75, 80, 85, 90, 95, 100,
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_seed() -> u64 { 1839 }
fn default_log_level() -> String { "info".to_string() }
fn default_first_year() -> i32 { 1839 }
fn default_town_name() -> String { "Township".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_a_complete_config() {
        let config = TownConfig::from_toml("").expect("empty config parses");
        assert!((config.relationships.friendship_threshold - 15.0).abs() < f64::EPSILON);
        assert!((config.affinity.spark_exponent - 0.765).abs() < f64::EPSILON);
        assert_eq!(config.general.first_year, 1839);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = TownConfig::from_toml(
            "[relationships]\nfriendship_threshold = 20.0\n[general]\nseed = 7\n",
        )
        .expect("partial config parses");
        assert!((config.relationships.friendship_threshold - 20.0).abs() < f64::EPSILON);
        assert!((config.relationships.enmity_threshold + 10.0).abs() < f64::EPSILON);
        assert_eq!(config.general.seed, 7);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = TownConfig::from_toml(
            "[relationships]\nfriendship_threshold = -20.0\nenmity_threshold = -10.0\n",
        )
        .expect_err("inverted thresholds must fail");
        assert!(matches!(err, crate::TownError::Config(_)));
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        assert!(TownConfig::from_toml("[marriage]\nname_change = 1.5\n").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[general]\nseed = 99\ntown_name = \"Elm Hollow\"").expect("write");
        let config = TownConfig::from_file(file.path()).expect("file config parses");
        assert_eq!(config.general.seed, 99);
        assert_eq!(config.general.town_name, "Elm Hollow");
    }

    #[test]
    fn trait_weights_are_a_dot_product() {
        let w = TraitWeights {
            openness: 1.0,
            conscientiousness: 0.0,
            extroversion: 2.0,
            agreeableness: 0.0,
            neuroticism: -1.0,
        };
        let p = Personality::new(0.5, 0.9, 0.25, -0.3, 0.5);
        assert!((w.apply(&p) - 0.5).abs() < 1e-12);
    }
}
