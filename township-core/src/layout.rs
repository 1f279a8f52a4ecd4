//! Collaborator interfaces: spatial layout and name generation.
//!
//! The engine never synthesizes streets or names itself. It asks a
//! [`TownLayout`] for distances and adjacency (only the scoring functions do)
//! and a [`NameSource`] for display names. A square-grid layout and a small
//! syllable name generator ship as defaults.

use rand::{Rng, RngCore};

use crate::types::{LotId, Sex};

/// Geometry of the town's lots.
pub trait TownLayout: Send + Sync {
    /// Number of lots; lots are `LotId(0)..LotId(n)`.
    fn lot_count(&self) -> usize;

    /// Travel distance between two lots.
    fn distance(&self, a: LotId, b: LotId) -> f64;

    /// Lots adjacent to `lot`.
    fn neighboring_lots(&self, lot: LotId) -> Vec<LotId>;

    /// Distance from `lot` to the centre of town.
    fn distance_from_downtown(&self, lot: LotId) -> f64;
}

/// A `width × height` grid of lots in row-major order, Manhattan distances,
/// four-neighbourhood adjacency, downtown at the centre cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    width: u32,
    height: u32,
}

impl GridLayout {
    /// A grid of `width × height` lots (each at least 1).
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn coords(&self, lot: LotId) -> (i64, i64) {
        (i64::from(lot.0 % self.width), i64::from(lot.0 / self.width))
    }

    fn downtown(&self) -> (i64, i64) {
        (i64::from(self.width / 2), i64::from(self.height / 2))
    }
}

impl TownLayout for GridLayout {
    fn lot_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    #[allow(clippy::cast_precision_loss)]
    fn distance(&self, a: LotId, b: LotId) -> f64 {
        let ((ax, ay), (bx, by)) = (self.coords(a), self.coords(b));
        ((ax - bx).abs() + (ay - by).abs()) as f64
    }

    fn neighboring_lots(&self, lot: LotId) -> Vec<LotId> {
        let (x, y) = self.coords(lot);
        [(x, y - 1), (x - 1, y), (x + 1, y), (x, y + 1)]
            .into_iter()
            .filter(|&(nx, ny)| {
                nx >= 0 && ny >= 0 && nx < i64::from(self.width) && ny < i64::from(self.height)
            })
            .filter_map(|(nx, ny)| u32::try_from(ny * i64::from(self.width) + nx).ok())
            .map(LotId)
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn distance_from_downtown(&self, lot: LotId) -> f64 {
        let ((x, y), (cx, cy)) = (self.coords(lot), self.downtown());
        ((x - cx).abs() + (y - cy).abs()) as f64
    }
}

/// Display-name generator.
pub trait NameSource: Send + Sync {
    /// A given name for someone of `sex`.
    fn given_name(&self, sex: Sex, rng: &mut dyn RngCore) -> String;

    /// A family name.
    fn surname(&self, rng: &mut dyn RngCore) -> String;
}

/// Names assembled from a fixed syllable table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyllableNames;

const ONSETS: [&str; 12] = ["Al", "Be", "Cor", "Da", "El", "Fen", "Gra", "Hol", "Ira", "Jo", "Ma", "Wil"];
const MALE_CODAS: [&str; 6] = ["bert", "ric", "ton", "son", "mund", "ward"];
const FEMALE_CODAS: [&str; 6] = ["ra", "na", "lie", "beth", "ine", "ette"];
const SURNAME_CODAS: [&str; 8] = ["ford", "wick", "more", "dale", "ridge", "field", "brook", "stone"];

fn pick<'a>(table: &[&'a str], rng: &mut dyn RngCore) -> &'a str {
    table[rng.gen_range(0..table.len())]
}

impl NameSource for SyllableNames {
    fn given_name(&self, sex: Sex, rng: &mut dyn RngCore) -> String {
        let coda = match sex {
            Sex::Male => pick(&MALE_CODAS, rng),
            Sex::Female => pick(&FEMALE_CODAS, rng),
        };
        format!("{}{coda}", pick(&ONSETS, rng))
    }

    fn surname(&self, rng: &mut dyn RngCore) -> String {
        format!("{}{}", pick(&ONSETS, rng), pick(&SURNAME_CODAS, rng))
    }
}
