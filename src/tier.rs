//! Rank tiers
//!
//! Fixed ordered brackets over the score range, used for gamified display.

use serde::{Deserialize, Serialize};

/// One named score bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub name: &'static str,
    pub min_score: i64,
    pub max_score: i64,
}

static TIERS: [Tier; 5] = [
    Tier {
        name: "Bronze",
        min_score: 250,
        max_score: 350,
    },
    Tier {
        name: "Silver",
        min_score: 351,
        max_score: 600,
    },
    Tier {
        name: "Gold",
        min_score: 601,
        max_score: 750,
    },
    Tier {
        name: "Platinum",
        min_score: 751,
        max_score: 900,
    },
    Tier {
        name: "Champion",
        min_score: 901,
        max_score: 1100,
    },
];

/// The tier table, lowest bracket first.
pub fn all_tiers() -> &'static [Tier] {
    &TIERS
}

/// The tier whose bracket contains `score`.
///
/// The engine's clamp floor sits below the Bronze minimum, so scores under
/// 250 resolve to Bronze; display always has a rank.
pub fn tier_for(score: i64) -> &'static Tier {
    TIERS
        .iter()
        .find(|tier| score <= tier.max_score)
        .unwrap_or(TIERS.last().expect("tier table is non-empty"))
}

/// A score's position within its tier, as reported to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStanding {
    pub name: String,
    pub min_score: i64,
    pub max_score: i64,
    /// Position inside the bracket, 0.0 at the floor to 1.0 at the ceiling
    pub progress: f64,
    /// Points needed to enter the next bracket; `None` at the top tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_to_next: Option<i64>,
}

/// Standing for a score: its tier, in-tier progress, and distance to the
/// next bracket.
pub fn standing_for(score: i64) -> TierStanding {
    let tier = tier_for(score);
    let span = (tier.max_score - tier.min_score) as f64;
    let progress = if span > 0.0 {
        (((score - tier.min_score) as f64) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let is_top = tier.max_score >= TIERS.last().expect("tier table is non-empty").max_score;
    let points_to_next = if is_top {
        None
    } else {
        Some(tier.max_score - score + 1)
    };

    TierStanding {
        name: tier.name.to_string(),
        min_score: tier.min_score,
        max_score: tier.max_score,
        progress,
        points_to_next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_edges() {
        assert_eq!(tier_for(350).name, "Bronze");
        assert_eq!(tier_for(351).name, "Silver");
        assert_eq!(tier_for(600).name, "Silver");
        assert_eq!(tier_for(601).name, "Gold");
        assert_eq!(tier_for(900).name, "Platinum");
        assert_eq!(tier_for(901).name, "Champion");
        assert_eq!(tier_for(1100).name, "Champion");
    }

    #[test]
    fn test_below_bronze_floor_clamps_to_bronze() {
        let standing = standing_for(200);
        assert_eq!(standing.name, "Bronze");
        assert_eq!(standing.progress, 0.0);
        assert_eq!(standing.points_to_next, Some(151));
    }

    #[test]
    fn test_progress_and_points_within_tier() {
        let standing = standing_for(300);
        assert_eq!(standing.name, "Bronze");
        assert!((standing.progress - 0.5).abs() < 1e-9);
        assert_eq!(standing.points_to_next, Some(51));
    }

    #[test]
    fn test_top_tier_has_no_next() {
        let standing = standing_for(1000);
        assert_eq!(standing.name, "Champion");
        assert_eq!(standing.points_to_next, None);
        assert!((standing.progress - 0.4974874).abs() < 1e-6);
    }

    #[test]
    fn test_table_is_contiguous() {
        for pair in all_tiers().windows(2) {
            assert_eq!(pair[0].max_score + 1, pair[1].min_score);
        }
    }
}
