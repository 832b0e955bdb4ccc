//! Clock and random implementations.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::infrastructure::ports::{ClockPort, RandomPort};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn roll_die(&self, sides: u8) -> u8 {
        rand::thread_rng().gen_range(1..=sides.max(1))
    }
}

/// Reproducible random - the same seed yields the same sequence of rolls.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomPort for SeededRandom {
    fn roll_die(&self, sides: u8) -> u8 {
        // A poisoned lock only means another roll panicked; the RNG state is still usable.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(1..=sides.max(1))
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed random for testing - every die shows the same face.
#[cfg(test)]
pub struct FixedRandom(pub u8);

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn roll_die(&self, _sides: u8) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let rolls_a: Vec<u8> = (0..20).map(|_| a.roll_die(20)).collect();
        let rolls_b: Vec<u8> = (0..20).map(|_| b.roll_die(20)).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_rolls_stay_in_range() {
        let random = SystemRandom::new();
        for _ in 0..500 {
            let face = random.roll_die(6);
            assert!((1..=6).contains(&face));
        }
    }
}
