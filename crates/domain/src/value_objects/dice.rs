//! Dice rolling value objects
//!
//! A pool of identical dice (e.g. 3d20) is rolled every turn and reduced to a
//! single number by an aggregation policy. The random source is injected as a
//! closure so the domain stays free of RNG dependencies and tests stay
//! deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Die size used when the game config does not specify one.
pub const DEFAULT_DIE_SIZE: u8 = 20;

/// How a pool of rolled dice is reduced to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiceAggregation {
    /// Arithmetic mean, rounded half-to-even.
    #[serde(rename = "avg", alias = "average")]
    Average,
    /// Lowest die (disadvantage-style).
    #[serde(rename = "min", alias = "minimum")]
    Minimum,
    /// Highest die (advantage-style).
    #[serde(rename = "max", alias = "maximum")]
    Maximum,
}

impl DiceAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "avg",
            Self::Minimum => "min",
            Self::Maximum => "max",
        }
    }

    /// Reduce a set of rolls to one value.
    ///
    /// Returns `None` for an empty slice.
    ///
    /// `Average` divides the sum by the number of dice and rounds half-to-even
    /// (13.5 -> 14, 14.5 -> 14), so ties never drift the result upwards.
    pub fn apply(&self, rolls: &[u8]) -> Option<u8> {
        if rolls.is_empty() {
            return None;
        }
        match self {
            Self::Average => Some(round_half_even_mean(rolls)),
            Self::Minimum => rolls.iter().copied().min(),
            Self::Maximum => rolls.iter().copied().max(),
        }
    }
}

fn round_half_even_mean(rolls: &[u8]) -> u8 {
    let sum: u32 = rolls.iter().map(|r| u32::from(*r)).sum();
    let count = rolls.len() as u32;
    let quotient = sum / count;
    let remainder = sum % count;

    let rounded = match (remainder * 2).cmp(&count) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 0 => quotient,
        std::cmp::Ordering::Equal => quotient + 1,
    };

    // The mean of u8 values always fits in a u8.
    u8::try_from(rounded).unwrap_or(u8::MAX)
}

impl fmt::Display for DiceAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiceAggregation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "avg" | "average" | "mean" => Ok(Self::Average),
            "min" | "minimum" => Ok(Self::Minimum),
            "max" | "maximum" => Ok(Self::Maximum),
            other => Err(DomainError::configuration(format!(
                "Unsupported dice aggregation '{}' (expected avg, min or max)",
                other
            ))),
        }
    }
}

/// A validated dice pool: how many dice, how many sides, and how to combine them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceAggregator {
    dice_count: u8,
    die_size: u8,
    aggregation: DiceAggregation,
}

impl DiceAggregator {
    pub fn new(
        dice_count: u8,
        die_size: u8,
        aggregation: DiceAggregation,
    ) -> Result<Self, DomainError> {
        if dice_count == 0 {
            return Err(DomainError::configuration(
                "Number of dice must be at least 1",
            ));
        }
        if die_size < 2 {
            return Err(DomainError::configuration("Die size must be at least 2"));
        }
        Ok(Self {
            dice_count,
            die_size,
            aggregation,
        })
    }

    /// Build from the policy name found in the game config ("avg", "min", "max").
    pub fn from_policy(dice_count: u8, die_size: u8, policy: &str) -> Result<Self, DomainError> {
        let aggregation = policy.parse()?;
        Self::new(dice_count, die_size, aggregation)
    }

    pub fn dice_count(&self) -> u8 {
        self.dice_count
    }

    pub fn die_size(&self) -> u8 {
        self.die_size
    }

    pub fn aggregation(&self) -> DiceAggregation {
        self.aggregation
    }

    /// Roll the pool using `roll_die`, which receives the die size and must
    /// return a face in `1..=die_size`.
    pub fn roll_with<F>(&self, mut roll_die: F) -> DiceRollResult
    where
        F: FnMut(u8) -> u8,
    {
        let individual_rolls: Vec<u8> = (0..self.dice_count)
            .map(|_| roll_die(self.die_size))
            .collect();

        // dice_count >= 1, so there is always at least one roll
        let total = self
            .aggregation
            .apply(&individual_rolls)
            .unwrap_or_default();

        DiceRollResult {
            individual_rolls,
            aggregation: self.aggregation,
            die_size: self.die_size,
            total,
        }
    }

    /// Format as "3d20 (avg)".
    pub fn display(&self) -> String {
        format!(
            "{}d{} ({})",
            self.dice_count, self.die_size, self.aggregation
        )
    }
}

impl fmt::Display for DiceAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Outcome of one turn's roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    /// Individual die results, in roll order
    pub individual_rolls: Vec<u8>,
    /// Policy used to combine them
    pub aggregation: DiceAggregation,
    /// Size of each die
    pub die_size: u8,
    /// Aggregate value shown to the player and the narrator
    pub total: u8,
}

impl DiceRollResult {
    /// Format as a breakdown string (e.g., "2d20 avg [12, 17] = 14")
    pub fn breakdown(&self) -> String {
        let rolls: Vec<String> = self
            .individual_rolls
            .iter()
            .map(|r| r.to_string())
            .collect();
        format!(
            "{}d{} {} [{}] = {}",
            self.individual_rolls.len(),
            self.die_size,
            self.aggregation,
            rolls.join(", "),
            self.total
        )
    }
}
