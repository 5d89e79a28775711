use rand::Rng;

use crate::ds::QTable;

use super::Choice;

/// Epsilon greedy exploration policy
///
/// The exploration rate is supplied on every call rather than stored, since the trainer anneals it
/// between episodes. Randomness always comes from the caller's generator, so a seeded generator
/// yields a reproducible sequence of choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsilonGreedy;

impl EpsilonGreedy {
    /// Explore with probability `epsilon`, otherwise exploit
    pub fn choose<R: Rng + ?Sized>(&self, epsilon: f32, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Pick an action for `state`: uniformly at random when exploring, the table's best action otherwise
    pub fn select_action<R: Rng + ?Sized>(
        &self,
        table: &QTable,
        state: usize,
        epsilon: f32,
        rng: &mut R,
    ) -> usize {
        match self.choose(epsilon, rng) {
            Choice::Explore => rng.gen_range(0..table.num_actions()),
            Choice::Exploit => table.best_action(state),
        }
    }
}
