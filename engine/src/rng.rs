// ═══════════════════════════════════════════════════════════════════════
// Dice source — the only randomness the engine consumes
//
// Consulted for: die rolls, spawn-definition draws, and
// `random_other_situation` targeting. Swapping the source never
// changes control flow, only the numbers drawn.
// ═══════════════════════════════════════════════════════════════════════

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub trait DiceSource {
    /// Uniform integer in `[low, high)`. Returns `low` when the range is empty.
    fn range(&mut self, low: i32, high: i32) -> i32;

    /// Uniform index in `[0, len)`.
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.range(0, len as i32) as usize
    }
}

/// Deterministic ChaCha8-backed source.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        SeededDice {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DiceSource for SeededDice {
    fn range(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }
}
