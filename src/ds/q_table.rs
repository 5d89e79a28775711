use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    assert_index,
    error::{Error, Result},
};

/// A dense table of action values, one row per state and one column per action
///
/// Rows are stored contiguously, so `Q(s, a)` lives at `s * num_actions + a`.
/// Every entry is finite; the table starts at zero and is only modified through [`update`](QTable::update)
/// (or [`set`](QTable::set) when seeding a table by hand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    num_states: usize,
    num_actions: usize,
    values: Vec<f32>,
}

impl QTable {
    /// Allocate a zero-filled table of shape `num_states × num_actions`
    ///
    /// **Panics** if either dimension is 0
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        assert!(
            num_states > 0 && num_actions > 0,
            "QTable dimensions must be nonzero, got {num_states}x{num_actions}"
        );
        Self {
            num_states,
            num_actions,
            values: vec![0.0; num_states * num_actions],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn offset(&self, state: usize, action: usize) -> usize {
        assert_index!("state", state, self.num_states);
        assert_index!("action", action, self.num_actions);
        state * self.num_actions + action
    }

    pub fn get(&self, state: usize, action: usize) -> f32 {
        self.values[self.offset(state, action)]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f32) {
        assert!(value.is_finite(), "Q values must be finite, got {value}");
        let ix = self.offset(state, action);
        self.values[ix] = value;
    }

    /// All action values for `state`, indexed by action
    pub fn row(&self, state: usize) -> &[f32] {
        assert_index!("state", state, self.num_states);
        let start = state * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    /// max<sub>a</sub> Q(state, a)
    pub fn max_value(&self, state: usize) -> f32 {
        self.row(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// The action with the highest value in `state`
    ///
    /// Ties go to the lowest action index.
    pub fn best_action(&self, state: usize) -> usize {
        let row = self.row(state);
        let mut best = 0;
        for (action, &value) in row.iter().enumerate().skip(1) {
            if value > row[best] {
                best = action;
            }
        }
        best
    }

    /// Apply the one-step Q-learning update for an observed transition
    ///
    /// Q(s,a) ← Q(s,a) + α(r + γ max<sub>a'</sub> Q(s',a') − Q(s,a))
    ///
    /// **Panics** if the new value is not finite
    pub fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: usize,
        alpha: f32,
        gamma: f32,
    ) {
        let value = self.updated_value(state, action, reward, next_state, alpha, gamma);
        self.set(state, action, value);
    }

    /// The value [`update`](QTable::update) would store for Q(state, action), without storing it
    pub fn updated_value(
        &self,
        state: usize,
        action: usize,
        reward: f32,
        next_state: usize,
        alpha: f32,
        gamma: f32,
    ) -> f32 {
        let q_value = self.get(state, action);
        let max_next_q = self.max_value(next_state);
        q_value + alpha * (reward + gamma * max_next_q - q_value)
    }

    /// Encode the table as a snapshot blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a snapshot blob produced by [`to_bytes`](QTable::to_bytes) or [`save`](QTable::save)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let table: Self = bincode::deserialize(bytes)?;
        table.validate()
    }

    /// Write a snapshot of the table to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a snapshot previously written with [`save`](QTable::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let table: Self = bincode::deserialize_from(reader)?;
        table.validate().inspect_err(|err| {
            warn!("Rejected Q-table snapshot {}: {err}", path.display());
        })
    }

    fn validate(self) -> Result<Self> {
        if self.num_states == 0 || self.num_actions == 0 {
            return Err(Error::CorruptSnapshot(format!(
                "empty shape {}x{}",
                self.num_states, self.num_actions
            )));
        }
        let expected = self.num_states.checked_mul(self.num_actions);
        if expected != Some(self.values.len()) {
            return Err(Error::CorruptSnapshot(format!(
                "shape {}x{} does not match {} stored values",
                self.num_states,
                self.num_actions,
                self.values.len()
            )));
        }
        if let Some(ix) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(Error::CorruptSnapshot(format!(
                "non-finite value at state {} action {}",
                ix / self.num_actions,
                ix % self.num_actions
            )));
        }
        Ok(self)
    }
}
