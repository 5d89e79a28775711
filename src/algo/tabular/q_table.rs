use log::{debug, info, trace};
use rand::Rng;

use crate::{
    assert_interval,
    ds::QTable,
    env::{EpisodeGuard, Environment, Transition},
    error::{Error, Result},
    exploration::EpsilonGreedy,
    metrics::{EpisodeSummary, RewardHistory},
};

/// Hyperparameters of the Q-learning update and their annealing schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParameters {
    /// Probability of taking a uniformly random action
    ///
    /// **Default**: `1.0`
    pub epsilon: f32,
    /// Learning rate
    ///
    /// **Default**: `0.9`
    pub alpha: f32,
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f32,
    /// Amount subtracted from `epsilon` after every training episode
    ///
    /// **Default**: `0.0001`
    pub epsilon_decay: f32,
    /// Learning rate used for the rest of training once `epsilon` has reached 0
    ///
    /// **Default**: `0.0001`
    pub alpha_floor: f32,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            alpha: 0.9,
            gamma: 0.9,
            epsilon_decay: 0.0001,
            alpha_floor: 0.0001,
        }
    }
}

impl TrainingParameters {
    /// Advance the schedule by one episode
    ///
    /// ε ← max(ε − decay, 0), and once ε is 0 the learning rate drops to `alpha_floor`.
    /// The drop is permanent: raising `epsilon` afterwards does not restore the previous rate.
    ///
    /// **Returns** `true` if this call is the one that dropped the learning rate
    pub fn anneal(&mut self) -> bool {
        self.epsilon = (self.epsilon - self.epsilon_decay).max(0.0);
        if self.epsilon == 0.0 && self.alpha != self.alpha_floor {
            self.alpha = self.alpha_floor;
            return true;
        }
        false
    }

    fn validate(&self) {
        let Self {
            epsilon,
            alpha,
            gamma,
            epsilon_decay,
            alpha_floor,
        } = *self;
        assert_interval!(epsilon, 0.0, 1.0);
        assert_interval!(alpha, 0.0, 1.0);
        assert_interval!(gamma, 0.0, 1.0);
        assert_interval!(alpha_floor, 0.0, 1.0);
        assert!(
            epsilon_decay >= 0.0 && epsilon_decay.is_finite(),
            "Invalid value for `epsilon_decay`. Must be finite and non-negative."
        );
    }
}

/// Whether the agent learns from its episodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Update the table after every transition and anneal parameters after every episode
    #[default]
    Train,
    /// Act from a fixed table: no updates, no annealing
    Evaluate,
}

/// Configuration for the [`QTableAgent`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QTableAgentConfig {
    pub params: TrainingParameters,
    /// An episode counts as a success when its final reward equals this value
    ///
    /// **Default**: `1.0`
    pub goal_reward: f32,
    /// **Default**: [`Mode::Train`]
    pub mode: Mode,
}

impl Default for QTableAgentConfig {
    fn default() -> Self {
        Self {
            params: TrainingParameters::default(),
            goal_reward: 1.0,
            mode: Mode::Train,
        }
    }
}

/// A Q-learning agent that utilizes a dense [`QTable`] to learn a discrete [`Environment`]
///
/// The agent owns its table for its whole lifetime. Drive it one episode at a time with
/// [`go`](QTableAgent::go), or for a fixed number of episodes with [`run`](QTableAgent::run);
/// stopping between episodes always leaves the table and history consistent.
#[derive(Debug, Clone)]
pub struct QTableAgent {
    table: QTable,
    policy: EpsilonGreedy,
    params: TrainingParameters,
    goal_reward: f32,
    mode: Mode,
    episode: u32,
    history: RewardHistory,
}

impl QTableAgent {
    /// Initialize a new `QTableAgent` around a table, either freshly allocated or loaded from a snapshot
    ///
    /// **Panics** if `epsilon`, `alpha`, `gamma` or `alpha_floor` is not in the interval `[0,1]`,
    /// or if `epsilon_decay` is negative
    pub fn new(table: QTable, config: QTableAgentConfig) -> Self {
        config.params.validate();
        Self {
            table,
            policy: EpsilonGreedy,
            params: config.params,
            goal_reward: config.goal_reward,
            mode: config.mode,
            episode: 0,
            history: RewardHistory::new(),
        }
    }

    /// An agent that acts greedily from `table`, exploring with the fixed probability `epsilon`
    pub fn evaluator(table: QTable, epsilon: f32) -> Self {
        Self::new(
            table,
            QTableAgentConfig {
                params: TrainingParameters {
                    epsilon,
                    epsilon_decay: 0.0,
                    ..Default::default()
                },
                mode: Mode::Evaluate,
                ..Default::default()
            },
        )
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn params(&self) -> &TrainingParameters {
        &self.params
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of episodes completed so far
    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn history(&self) -> &RewardHistory {
        &self.history
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn into_parts(self) -> (QTable, RewardHistory) {
        (self.table, self.history)
    }

    fn check_shape<E: Environment + ?Sized>(&self, env: &E) -> Result<()> {
        let table = (self.table.num_states(), self.table.num_actions());
        let env = (env.num_states(), env.num_actions());
        if table != env {
            return Err(Error::ShapeMismatch { table, env });
        }
        Ok(())
    }

    fn check_transition(&self, transition: &Transition) -> Result<()> {
        if transition.next_state >= self.table.num_states() {
            return Err(Error::InvalidTransition(format!(
                "next state {} is outside [0, {})",
                transition.next_state,
                self.table.num_states()
            )));
        }
        if !transition.reward.is_finite() {
            return Err(Error::InvalidTransition(format!(
                "non-finite reward {}",
                transition.reward
            )));
        }
        Ok(())
    }

    /// Run a single episode in the given environment
    ///
    /// Any error from the environment, an out-of-range state, or a reward that would overflow the
    /// table aborts the episode.
    /// Updates already applied during the aborted episode are kept; nothing is recorded in the history.
    pub fn go<E, R>(&mut self, env: &mut E, rng: &mut R) -> Result<EpisodeSummary>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        self.check_shape(&*env)?;
        let mut env = EpisodeGuard::new(env);
        let TrainingParameters {
            epsilon,
            alpha,
            gamma,
            ..
        } = self.params;

        let mut summary = EpisodeSummary::default();
        let mut state = env.reset()?;
        if state >= self.table.num_states() {
            return Err(Error::InvalidTransition(format!(
                "initial state {state} is outside [0, {})",
                self.table.num_states()
            )));
        }
        loop {
            let action = self.policy.select_action(&self.table, state, epsilon, rng);
            let transition = env.step(action)?;
            self.check_transition(&transition)?;

            let Transition {
                next_state, reward, ..
            } = transition;
            trace!(
                "step {}: s={state} a={action} r={reward} s'={next_state}",
                summary.steps
            );

            if self.mode == Mode::Train {
                let value = self
                    .table
                    .updated_value(state, action, reward, next_state, alpha, gamma);
                if !value.is_finite() {
                    return Err(Error::InvalidTransition(format!(
                        "reward {reward} overflows Q({state}, {action})"
                    )));
                }
                self.table.set(state, action, value);
            }

            summary.steps += 1;
            summary.total_reward += reward;
            summary.final_reward = reward;
            state = next_state;

            if transition.is_done() {
                break;
            }
        }

        summary.success = summary.final_reward == self.goal_reward;
        self.history.push(summary);

        if self.mode == Mode::Train && self.params.anneal() {
            info!(
                "Exploration exhausted after episode {}, learning rate set to {}",
                self.episode, self.params.alpha
            );
        }

        debug!(
            "Episode {}: steps={} reward={} success={} epsilon={} alpha={}",
            self.episode,
            summary.steps,
            summary.total_reward,
            summary.success,
            self.params.epsilon,
            self.params.alpha,
        );
        self.episode += 1;

        Ok(summary)
    }

    /// Run `num_episodes` episodes back to back, stopping at the first error
    pub fn run<E, R>(&mut self, env: &mut E, num_episodes: usize, rng: &mut R) -> Result<()>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        info!(
            "Starting {num_episodes} {:?} episodes on a {}x{} table",
            self.mode,
            self.table.num_states(),
            self.table.num_actions()
        );
        let start = self.history.len();
        for _ in 0..num_episodes {
            self.go(env, rng)?;
        }
        let successes = self.history.episodes()[start..]
            .iter()
            .filter(|e| e.success)
            .count();
        info!("Finished {num_episodes} episodes with {successes} successes");
        Ok(())
    }
}

/// Learn a table from scratch over `num_episodes` episodes
///
/// **Returns** the learned table and the outcome of every episode
pub fn train<E, R>(
    env: &mut E,
    num_episodes: usize,
    params: TrainingParameters,
    rng: &mut R,
) -> Result<(QTable, RewardHistory)>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let table = QTable::new(env.num_states(), env.num_actions());
    let config = QTableAgentConfig {
        params,
        ..Default::default()
    };
    let mut agent = QTableAgent::new(table, config);
    agent.run(env, num_episodes, rng)?;
    Ok(agent.into_parts())
}

/// Act greedily from a trained table for `num_episodes` episodes, without learning
pub fn evaluate<E, R>(
    env: &mut E,
    table: QTable,
    num_episodes: usize,
    rng: &mut R,
) -> Result<RewardHistory>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let mut agent = QTableAgent::evaluator(table, 0.0);
    agent.run(env, num_episodes, rng)?;
    Ok(agent.into_parts().1)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::env::tests::MockEnv;

    /// Reports an out-of-range state on its first step
    struct BrokenEnv;

    impl Environment for BrokenEnv {
        fn num_states(&self) -> usize {
            4
        }

        fn num_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn step(&mut self, _action: usize) -> Result<Transition> {
            Ok(Transition {
                next_state: 9,
                reward: 0.0,
                terminated: false,
                truncated: false,
            })
        }
    }

    /// Fails on every step
    struct FailingEnv;

    impl Environment for FailingEnv {
        fn num_states(&self) -> usize {
            1
        }

        fn num_actions(&self) -> usize {
            1
        }

        fn reset(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn step(&mut self, _action: usize) -> Result<Transition> {
            Err(Error::environment("simulator crashed"))
        }
    }

    /// Starts every episode in a state the table does not have
    struct BadResetEnv;

    impl Environment for BadResetEnv {
        fn num_states(&self) -> usize {
            4
        }

        fn num_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> Result<usize> {
            Ok(7)
        }

        fn step(&mut self, _action: usize) -> Result<Transition> {
            unreachable!("episode must abort before the first step")
        }
    }

    /// A single self-looping state that pays the largest finite reward on every step
    struct HugeRewardEnv;

    impl Environment for HugeRewardEnv {
        fn num_states(&self) -> usize {
            1
        }

        fn num_actions(&self) -> usize {
            1
        }

        fn reset(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn step(&mut self, _action: usize) -> Result<Transition> {
            Ok(Transition {
                next_state: 0,
                reward: f32::MAX,
                terminated: false,
                truncated: false,
            })
        }
    }

    fn fast_params() -> TrainingParameters {
        TrainingParameters {
            epsilon_decay: 0.01,
            alpha_floor: 0.001,
            ..Default::default()
        }
    }

    #[test]
    fn anneal_clamps_and_floors() {
        let mut params = TrainingParameters {
            epsilon: 0.25,
            epsilon_decay: 0.1,
            ..Default::default()
        };
        assert!(!params.anneal());
        assert!(!params.anneal());
        assert_eq!(params.alpha, 0.9, "Learning rate kept while exploring");
        assert!(params.anneal(), "Third step reaches zero and floors alpha");
        assert_eq!(params.epsilon, 0.0, "Epsilon clamped at zero");
        assert_eq!(params.alpha, params.alpha_floor);
        assert!(!params.anneal(), "Floor applies only once");
        assert_eq!(params.epsilon, 0.0, "Epsilon never negative");

        params.epsilon = 0.5;
        params.anneal();
        assert_eq!(params.alpha, params.alpha_floor, "Floor survives raising epsilon");
    }

    #[test]
    #[should_panic(expected = "Invalid value for `alpha`")]
    fn agent_rejects_bad_alpha() {
        let config = QTableAgentConfig {
            params: TrainingParameters {
                alpha: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        QTableAgent::new(QTable::new(2, 2), config);
    }

    #[test]
    fn train_zero_episodes() {
        let mut env = MockEnv::new(4, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let (table, history) = train(&mut env, 0, Default::default(), &mut rng).unwrap();
        assert_eq!(table, QTable::new(4, 2), "Table untouched");
        assert!(history.is_empty(), "No episodes recorded");
    }

    #[test]
    fn epsilon_schedule_across_episodes() {
        let mut env = MockEnv::new(3, 20);
        let mut rng = StdRng::seed_from_u64(5);
        let config = QTableAgentConfig {
            params: TrainingParameters {
                epsilon: 1.0,
                epsilon_decay: 0.3,
                alpha_floor: 0.05,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut agent = QTableAgent::new(QTable::new(3, 2), config);

        let mut previous = agent.params().epsilon;
        let mut floored = false;
        for _ in 0..8 {
            let alpha_used = agent.params().alpha;
            if floored {
                assert_eq!(alpha_used, 0.05, "Episodes after epsilon hits zero use the floor");
            }
            agent.go(&mut env, &mut rng).unwrap();
            let epsilon = agent.params().epsilon;
            assert!(epsilon <= previous, "Epsilon is non-increasing");
            assert!(epsilon >= 0.0, "Epsilon is never negative");
            floored |= epsilon == 0.0;
            previous = epsilon;
        }
        assert!(floored, "Epsilon reached zero");
        assert_eq!(agent.episode(), 8);
        assert_eq!(agent.history().len(), 8);
    }

    #[test]
    fn learns_corridor() {
        let mut env = MockEnv::new(5, 50);
        let mut rng = StdRng::seed_from_u64(11);
        let (table, history) = train(&mut env, 300, fast_params(), &mut rng).unwrap();

        for s in 0..4 {
            assert_eq!(table.best_action(s), 1, "Moving right is best in state {s}");
        }
        assert!(
            history.episodes()[290..].iter().all(|e| e.success && e.steps == 4),
            "Greedy episodes walk straight to the goal"
        );
    }

    #[test]
    fn training_is_reproducible() {
        let run = |seed| {
            let mut env = MockEnv::new(5, 30);
            let mut rng = StdRng::seed_from_u64(seed);
            train(&mut env, 50, fast_params(), &mut rng).unwrap()
        };
        assert_eq!(run(3), run(3), "Same seed gives same table and history");
    }

    #[test]
    fn evaluation_leaves_table_untouched() {
        let mut env = MockEnv::new(5, 50);
        let mut rng = StdRng::seed_from_u64(2);
        let (table, _) = train(&mut env, 200, fast_params(), &mut rng).unwrap();

        let mut agent = QTableAgent::evaluator(table.clone(), 0.0);
        agent.run(&mut env, 5, &mut rng).unwrap();
        assert_eq!(agent.mode(), Mode::Evaluate);
        assert_eq!(agent.params().epsilon, 0.0, "Epsilon fixed during evaluation");
        assert_eq!(agent.params().alpha, 0.9, "No annealing during evaluation");
        assert_eq!(agent.table(), &table, "Table is read-only during evaluation");

        let history = evaluate(&mut env, table, 5, &mut rng).unwrap();
        assert_eq!(history.success_count(), 5, "Trained table solves the corridor");
    }

    #[test]
    fn goal_reward_decides_success() {
        let mut env = MockEnv::new(2, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let mut table = QTable::new(2, 2);
        table.set(0, 1, 1.0);
        let config = QTableAgentConfig {
            goal_reward: 2.0,
            mode: Mode::Evaluate,
            params: TrainingParameters {
                epsilon: 0.0,
                ..Default::default()
            },
        };
        let mut agent = QTableAgent::new(table, config);
        let summary = agent.go(&mut env, &mut rng).unwrap();
        assert_eq!(summary.final_reward, 1.0);
        assert!(!summary.success, "Reward 1 is not the goal reward 2");
    }

    #[test]
    fn truncated_episode_is_not_success() {
        let mut env = MockEnv::new(4, 3);
        let mut rng = StdRng::seed_from_u64(0);
        // Greedy on a zero table always stays put
        let history = evaluate(&mut env, QTable::new(4, 2), 2, &mut rng).unwrap();
        for e in history.episodes() {
            assert_eq!(e.steps, 3, "Episode ran until truncation");
            assert!(!e.success);
        }
    }

    #[test]
    fn invalid_transition_aborts_episode() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut agent = QTableAgent::new(QTable::new(4, 2), Default::default());
        let result = agent.go(&mut BrokenEnv, &mut rng);
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
        assert!(agent.history().is_empty(), "Aborted episode not recorded");
        assert_eq!(agent.params().epsilon, 1.0, "Aborted episode not annealed");
    }

    #[test]
    fn environment_error_propagates() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = train(&mut FailingEnv, 3, Default::default(), &mut rng);
        assert!(matches!(result, Err(Error::Environment(e)) if e.to_string() == "simulator crashed"));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut env = MockEnv::new(5, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let result = evaluate(&mut env, QTable::new(64, 4), 1, &mut rng);
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                table: (64, 4),
                env: (5, 2)
            })
        ));
    }

    #[test]
    fn invalid_initial_state_aborts_episode() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = evaluate(&mut BadResetEnv, QTable::new(4, 2), 1, &mut rng);
        assert!(
            matches!(result, Err(Error::InvalidTransition(msg)) if msg.contains("initial state 7")),
            "Out-of-range reset state is an error, not a panic"
        );
    }

    #[test]
    fn overflowing_update_aborts_episode() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut agent = QTableAgent::new(QTable::new(1, 1), Default::default());
        let result = agent.go(&mut HugeRewardEnv, &mut rng);
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
        let value = agent.table().get(0, 0);
        assert!(value.is_finite(), "Table keeps only finite values, got {value}");

        let restored = QTable::from_bytes(&agent.table().to_bytes().unwrap()).unwrap();
        assert_eq!(&restored, agent.table(), "Table still round-trips through a snapshot");
    }

    #[test]
    fn resume_training_from_snapshot() {
        let path = std::env::temp_dir().join(format!("qlearn-{}-resume.bin", std::process::id()));
        let mut env = MockEnv::new(5, 50);
        let mut rng = StdRng::seed_from_u64(4);
        let (table, _) = train(&mut env, 20, fast_params(), &mut rng).unwrap();
        table.save(&path).unwrap();

        let loaded = QTable::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, table, "Snapshot restores the trained table");

        let config = QTableAgentConfig {
            params: TrainingParameters {
                epsilon: 0.5,
                ..fast_params()
            },
            ..Default::default()
        };
        let mut agent = QTableAgent::new(loaded, config);
        assert_eq!(agent.mode(), Mode::Train);
        assert_eq!(agent.table(), &table, "Resumed agent starts from the snapshot");

        agent.run(&mut env, 10, &mut rng).unwrap();
        assert_ne!(agent.table(), &table, "Resumed training keeps updating the table");
        assert!(agent.params().epsilon < 0.5, "Resumed training anneals epsilon");
        assert_eq!(agent.history().len(), 10);
    }
}
