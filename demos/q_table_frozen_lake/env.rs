use qlearn::{
    env::{Environment, Transition},
    Result,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const MAP: [&str; 8] = [
    "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF", "FFFHFFFG",
];
const SIZE: usize = 8;
const MAX_STEPS: u32 = 200;

#[derive(Clone, Copy, PartialEq)]
enum Tile {
    Start,
    Frozen,
    Hole,
    Goal,
}

/// The 8x8 slippery frozen lake
///
/// Actions are 0 = left, 1 = down, 2 = right, 3 = up. On the slippery surface the agent moves in the
/// intended direction or in one of the two perpendicular directions, each with probability 1/3.
/// Reaching the goal yields reward 1, everything else 0. Episodes are truncated after 200 steps.
pub struct FrozenLake {
    tiles: Vec<Tile>,
    pos: usize,
    steps: u32,
    slippery: bool,
    rng: StdRng,
}

impl FrozenLake {
    pub fn new(slippery: bool, seed: u64) -> Self {
        let tiles = MAP
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| match c {
                'S' => Tile::Start,
                'H' => Tile::Hole,
                'G' => Tile::Goal,
                _ => Tile::Frozen,
            })
            .collect();
        Self {
            tiles,
            pos: 0,
            steps: 0,
            slippery,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn moved(&self, direction: usize) -> usize {
        let (row, col) = (self.pos / SIZE, self.pos % SIZE);
        let (row, col) = match direction {
            0 => (row, col.saturating_sub(1)),
            1 => ((row + 1).min(SIZE - 1), col),
            2 => (row, (col + 1).min(SIZE - 1)),
            _ => (row.saturating_sub(1), col),
        };
        row * SIZE + col
    }
}

impl Environment for FrozenLake {
    fn num_states(&self) -> usize {
        SIZE * SIZE
    }

    fn num_actions(&self) -> usize {
        4
    }

    fn reset(&mut self) -> Result<usize> {
        self.pos = self
            .tiles
            .iter()
            .position(|&t| t == Tile::Start)
            .unwrap_or_default();
        self.steps = 0;
        Ok(self.pos)
    }

    fn step(&mut self, action: usize) -> Result<Transition> {
        let direction = if self.slippery {
            (action + self.rng.gen_range(3..=5)) % 4
        } else {
            action
        };
        self.pos = self.moved(direction);
        self.steps += 1;

        let tile = self.tiles[self.pos];
        let terminated = matches!(tile, Tile::Hole | Tile::Goal);
        Ok(Transition {
            next_state: self.pos,
            reward: if tile == Tile::Goal { 1.0 } else { 0.0 },
            terminated,
            truncated: !terminated && self.steps >= MAX_STEPS,
        })
    }
}
