use crate::error::{Error, Result};

/// The outcome of a single environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// The state reached after taking the action
    pub next_state: usize,
    /// The reward received for taking the action
    pub reward: f32,
    /// The episode ended in a terminal state (goal reached, agent fell in a hole, ...)
    pub terminated: bool,
    /// The episode was cut short by an external limit such as a step cap
    pub truncated: bool,
}

impl Transition {
    /// Whether the episode ends with this transition
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Represents a Markov decision process with a finite, discrete state space and action space.
///
/// States are indices in `[0, num_states)` and actions are indices in `[0, num_actions)`.
/// Both counts must be fixed for the lifetime of the environment, since they determine the shape
/// of the [`QTable`](crate::ds::QTable) trained against it.
pub trait Environment {
    /// Number of distinct states
    fn num_states(&self) -> usize;

    /// Number of distinct actions, available in every state
    fn num_actions(&self) -> usize;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the initial state
    fn reset(&mut self) -> Result<usize>;

    /// Update the environment in response to an action taken by an agent
    fn step(&mut self, action: usize) -> Result<Transition>;
}

impl<E: Environment + ?Sized> Environment for &mut E {
    fn num_states(&self) -> usize {
        (**self).num_states()
    }

    fn num_actions(&self) -> usize {
        (**self).num_actions()
    }

    fn reset(&mut self) -> Result<usize> {
        (**self).reset()
    }

    fn step(&mut self, action: usize) -> Result<Transition> {
        (**self).step(action)
    }
}

/// Wraps an [`Environment`] and refuses to step it once an episode has ended
///
/// Stepping after a terminal or truncated transition, without an intervening [`reset`](Environment::reset),
/// yields [`Error::EpisodeOver`] instead of reaching the inner environment.
#[derive(Debug)]
pub struct EpisodeGuard<E> {
    inner: E,
    done: bool,
}

impl<E: Environment> EpisodeGuard<E> {
    /// Wrap an environment. The guard starts in the "over" state, so it must be reset before the first step.
    pub fn new(inner: E) -> Self {
        Self { inner, done: true }
    }

    /// Whether the current episode has ended
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Environment> Environment for EpisodeGuard<E> {
    fn num_states(&self) -> usize {
        self.inner.num_states()
    }

    fn num_actions(&self) -> usize {
        self.inner.num_actions()
    }

    fn reset(&mut self) -> Result<usize> {
        let state = self.inner.reset()?;
        self.done = false;
        Ok(state)
    }

    fn step(&mut self, action: usize) -> Result<Transition> {
        if self.done {
            return Err(Error::EpisodeOver);
        }
        let transition = self.inner.step(action)?;
        self.done = transition.is_done();
        Ok(transition)
    }
}
