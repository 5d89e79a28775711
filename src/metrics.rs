use crate::ds::RingBuffer;

/// Outcome of a single episode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeSummary {
    /// Number of environment steps taken
    pub steps: u32,
    /// Sum of all rewards received
    pub total_reward: f32,
    /// Reward of the last transition
    pub final_reward: f32,
    /// Whether the last reward equaled the goal reward
    pub success: bool,
}

/// Append-only record of episode outcomes, in the order the episodes were run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardHistory {
    episodes: Vec<EpisodeSummary>,
}

impl RewardHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, summary: EpisodeSummary) {
        self.episodes.push(summary);
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn episodes(&self) -> &[EpisodeSummary] {
        &self.episodes
    }

    /// Per-episode success flags
    pub fn successes(&self) -> impl Iterator<Item = bool> + '_ {
        self.episodes.iter().map(|e| e.success)
    }

    pub fn success_count(&self) -> usize {
        self.successes().filter(|&s| s).count()
    }
}

/// Running sum over the trailing `window` values, one output per input
fn trailing_sums(
    values: impl Iterator<Item = f32>,
    window: usize,
) -> impl Iterator<Item = (f32, usize)> {
    assert!(window > 0, "Window size must be nonzero");
    let mut buf = RingBuffer::new(window);
    let mut sum = 0.0;
    values.map(move |x| {
        sum += x;
        if let Some(evicted) = buf.push(x) {
            sum -= evicted;
        }
        (sum, buf.len())
    })
}

/// Number of successes among the trailing `window` episodes, for every episode in `history`
///
/// Element `t` counts episodes `t + 1 - window ..= t`, clamped at the start of history.
///
/// **Panics** if `window` is 0
pub fn windowed_success_count(history: &RewardHistory, window: usize) -> Vec<f32> {
    trailing_sums(history.successes().map(f32::from), window)
        .map(|(sum, _)| sum)
        .collect()
}

/// Fraction of successful episodes among the trailing `window` episodes, for every episode in `history`
///
/// Near the start of history the mean is taken over the episodes available so far.
///
/// **Panics** if `window` is 0
pub fn windowed_success_rate(history: &RewardHistory, window: usize) -> Vec<f32> {
    trailing_sums(history.successes().map(f32::from), window)
        .map(|(sum, n)| sum / n as f32)
        .collect()
}
