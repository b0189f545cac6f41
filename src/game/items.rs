//! Collectible item catalog and weighted generator.
//!
//! Category selection uses one uniform draw against cumulative thresholds
//! (premium 10%, good 50%, bad 40%); the concrete item is then picked
//! uniformly within its category. Generated items are fully owned values
//! with no ties back to the catalog tables.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Category of a collectible. Determines rarity and the sign of the delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Good,
    Premium,
    Bad,
}

/// A collectible as spawned into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque display token; the engine never interprets it.
    pub symbol: String,
    pub points: i32,
    pub category: ItemCategory,
}

const GOOD_ITEMS: [(&str, i32); 4] = [("🍬", 1), ("🎅", 1), ("🍊", 1), ("🎄", 1)];
const PREMIUM_ITEMS: [(&str, i32); 1] = [("💧", 2)];
const BAD_ITEMS: [(&str, i32); 4] = [("🍌", -1), ("🍩", -1), ("🍍", -1), ("⏰", -1)];

// Cumulative thresholds over a single uniform draw in [0, 1).
const PREMIUM_THRESHOLD: f64 = 0.10;
const GOOD_THRESHOLD: f64 = 0.60;

/// Generate one random collectible. Pure aside from consuming randomness.
pub fn generate(rng: &mut impl Rng) -> Item {
    let roll: f64 = rng.gen();
    let (category, table): (ItemCategory, &[(&str, i32)]) = if roll < PREMIUM_THRESHOLD {
        (ItemCategory::Premium, &PREMIUM_ITEMS)
    } else if roll < GOOD_THRESHOLD {
        (ItemCategory::Good, &GOOD_ITEMS)
    } else {
        (ItemCategory::Bad, &BAD_ITEMS)
    };
    let (symbol, points) = table[rng.gen_range(0..table.len())];
    Item {
        symbol: symbol.to_string(),
        points,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn points_match_category() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let item = generate(&mut rng);
            match item.category {
                ItemCategory::Good => assert_eq!(item.points, 1),
                ItemCategory::Premium => assert_eq!(item.points, 2),
                ItemCategory::Bad => assert_eq!(item.points, -1),
            }
            assert!(!item.symbol.is_empty());
        }
    }

    #[test]
    fn category_distribution_is_roughly_weighted() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut premium = 0u32;
        let mut good = 0u32;
        let mut bad = 0u32;
        const SAMPLES: u32 = 20_000;
        for _ in 0..SAMPLES {
            match generate(&mut rng).category {
                ItemCategory::Premium => premium += 1,
                ItemCategory::Good => good += 1,
                ItemCategory::Bad => bad += 1,
            }
        }
        let pct = |n: u32| f64::from(n) / f64::from(SAMPLES);
        assert!((pct(premium) - 0.10).abs() < 0.02, "premium {}", pct(premium));
        assert!((pct(good) - 0.50).abs() < 0.02, "good {}", pct(good));
        assert!((pct(bad) - 0.40).abs() < 0.02, "bad {}", pct(bad));
    }

    #[test]
    fn generated_items_are_owned_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut item = generate(&mut rng);
        // Callers may mutate or discard freely.
        item.symbol.push('!');
        assert!(item.symbol.ends_with('!'));
    }
}
