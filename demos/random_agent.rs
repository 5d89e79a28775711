use std::error::Error;

use log::{info, warn};
use qlearn::{
    ds::QTable,
    env::{EpisodeGuard, Environment, Transition},
    exploration::EpsilonGreedy,
    Result,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A single-state game that lasts ten steps and pays a random reward for every action
struct CountdownEnv {
    steps_left: u32,
    rng: StdRng,
}

impl Environment for CountdownEnv {
    fn num_states(&self) -> usize {
        1
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<usize> {
        self.steps_left = 10;
        Ok(0)
    }

    fn step(&mut self, _action: usize) -> Result<Transition> {
        self.steps_left -= 1;
        Ok(Transition {
            next_state: 0,
            reward: self.rng.gen(),
            terminated: self.steps_left == 0,
            truncated: false,
        })
    }
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut env = EpisodeGuard::new(CountdownEnv {
        steps_left: 0,
        rng: StdRng::seed_from_u64(1),
    });
    let table = QTable::new(env.num_states(), env.num_actions());
    let mut rng = StdRng::seed_from_u64(2);

    let mut state = env.reset()?;
    let mut total_reward = 0.0;
    while !env.is_done() {
        let action = EpsilonGreedy.select_action(&table, state, 1.0, &mut rng);
        let transition = env.step(action)?;
        total_reward += transition.reward;
        state = transition.next_state;
    }
    info!("Total reward got: {total_reward:.4}");

    if let Err(err) = env.step(0) {
        warn!("Stepping past the end of the game: {err}");
    }

    Ok(())
}
