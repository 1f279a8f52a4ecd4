//! Driver configuration.
//!
//! Wraps the core [`TownConfig`] with what only a running driver needs: the
//! grid size, starter businesses, yearly life-cycle probabilities and
//! logging. Maps to `township.toml`; every section has defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use township_core::company::CompanyKind;
use township_core::{Result, TownConfig, TownError};

/// Top-level driver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Core simulation settings.
    #[serde(default)]
    pub town: TownConfig,
    /// Town layout and founding.
    #[serde(default)]
    pub founding: FoundingConfig,
    /// Yearly life-cycle probabilities.
    #[serde(default)]
    pub life: LifeConfig,
    /// Subscriber output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DriverConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TownError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| TownError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject inconsistent values.
    ///
    /// # Errors
    /// Returns `TownError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.town.validate()?;
        if self.founding.grid_width == 0 || self.founding.grid_height == 0 {
            return Err(TownError::Config("founding grid must have at least one lot".to_string()));
        }
        let l = &self.life;
        for (key, value) in [
            ("life.retirement_chance", l.retirement_chance),
            ("life.proposal_chance", l.proposal_chance),
            ("life.divorce_chance", l.divorce_chance),
            ("life.birth_chance", l.birth_chance),
            ("life.closure_chance", l.closure_chance),
            ("life.mortality_base", l.mortality_base),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TownError::Config(format!("{key} must be within [0, 1]")));
            }
        }
        if l.mortality_growth < 1.0 {
            return Err(TownError::Config("life.mortality_growth must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Layout and the businesses a new town opens with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundingConfig {
    /// Lots across.
    pub grid_width: u32,
    /// Lots down.
    pub grid_height: u32,
    /// Businesses opened after the founder's construction firm, in order.
    pub starter_businesses: Vec<CompanyKind>,
}

impl Default for FoundingConfig {
    fn default() -> Self {
        Self {
            grid_width: 8,
            grid_height: 8,
            starter_businesses: vec![
                CompanyKind::CityHall,
                CompanyKind::GroceryStore,
                CompanyKind::Hospital,
                CompanyKind::LawFirm,
                CompanyKind::School,
                CompanyKind::ApartmentComplex,
            ],
        }
    }
}

/// Per-year probabilities for the life-cycle systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeConfig {
    /// Age from which workers may retire.
    pub retirement_age: u32,
    /// Yearly retirement chance past that age.
    pub retirement_chance: f64,
    /// Yearly death hazard at age zero.
    pub mortality_base: f64,
    /// Multiplicative growth of the hazard per year of age.
    pub mortality_growth: f64,
    /// Minimum spark, in each direction, for a proposal.
    pub proposal_spark: f64,
    /// Youngest age to marry.
    pub marriage_age: u32,
    /// Yearly chance a mutually smitten pair marries.
    pub proposal_chance: f64,
    /// Yearly chance a married couple divorces.
    pub divorce_chance: f64,
    /// Youngest age to bear a child.
    pub fertility_start: u32,
    /// Oldest age to bear a child.
    pub fertility_end: u32,
    /// Yearly chance a married woman of fertile age gives birth.
    pub birth_chance: f64,
    /// Oldest age at which a jobless worker looks for a pooled vacancy.
    pub job_seeking_age: u32,
    /// Yearly chance a company whose founder is gone or retired closes.
    pub closure_chance: f64,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            retirement_age: 65,
            retirement_chance: 0.1,
            mortality_base: 0.000_5,
            mortality_growth: 1.085,
            proposal_spark: 10.0,
            marriage_age: 18,
            proposal_chance: 0.5,
            divorce_chance: 0.007,
            fertility_start: 16,
            fertility_end: 42,
            birth_chance: 0.2,
            job_seeking_age: 30,
            closure_chance: 0.2,
        }
    }
}

impl LifeConfig {
    /// Yearly chance of dying at `age`.
    #[must_use]
    pub fn mortality(&self, age: u32) -> f64 {
        #[allow(clippy::cast_possible_wrap)]
        let hazard = self.mortality_base * self.mortality_growth.powi(age as i32);
        hazard.clamp(0.0, 1.0)
    }
}

/// Subscriber output format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = DriverConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.founding.grid_width, 8);
        assert_eq!(config.life.retirement_age, 65);
        assert_eq!(config.town.general.town_name, TownConfig::default().general.town_name);
    }

    #[test]
    fn nested_town_section_parses() {
        let config = DriverConfig::from_toml(
            "[town.general]\nseed = 7\n\n[founding]\ngrid_width = 4\nstarter_businesses = [\"Bar\"]\n",
        )
        .expect("parses");
        assert_eq!(config.town.general.seed, 7);
        assert_eq!(config.founding.grid_width, 4);
        assert_eq!(config.founding.starter_businesses, vec![CompanyKind::Bar]);
    }

    #[test]
    fn bad_probability_is_rejected() {
        let err = DriverConfig::from_toml("[life]\nbirth_chance = 2.0\n").expect_err("rejected");
        assert!(matches!(err, TownError::Config(_)));
        assert!(DriverConfig::from_toml("[founding]\ngrid_width = 0\n").is_err());
    }

    #[test]
    fn mortality_rises_with_age() {
        let life = LifeConfig::default();
        assert!(life.mortality(20) < life.mortality(60));
        assert!(life.mortality(80) > 0.2);
        assert!(life.mortality(200) <= 1.0);
    }

    #[test]
    fn loads_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[logging]\njson = true").expect("write");
        let config = DriverConfig::from_file(file.path()).expect("file config parses");
        assert!(config.logging.json);
    }
}
