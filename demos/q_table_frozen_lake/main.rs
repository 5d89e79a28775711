use std::{error::Error, fs, path::Path};

use env::FrozenLake;
use log::info;
use qlearn::{
    algo::tabular::q_table::{evaluate, train, TrainingParameters},
    ds::QTable,
    metrics::windowed_success_count,
};
use rand::{rngs::StdRng, SeedableRng};

mod env;

const NUM_EPISODES: usize = 15000;
const EVAL_EPISODES: usize = 100;
// Trailing sum over episodes t-100..=t
const WINDOW: usize = 101;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let out = Path::new("demos/q_table_frozen_lake/out");
    fs::create_dir_all(out)?;

    let mut env = FrozenLake::new(true, 0);
    let mut rng = StdRng::seed_from_u64(0);
    let (table, history) = train(&mut env, NUM_EPISODES, TrainingParameters::default(), &mut rng)?;

    let snapshot = out.join("frozen_lake8x8.bin");
    table.save(&snapshot)?;
    info!("Saved Q-table to {}", snapshot.display());

    let mut wtr = csv::Writer::from_path(out.join("data.csv"))?;
    wtr.write_record(["episode", "successes"])?;
    for (i, count) in windowed_success_count(&history, WINDOW).iter().enumerate() {
        wtr.write_record([i.to_string(), count.to_string()])?;
    }
    wtr.flush()?;

    let table = QTable::load(&snapshot)?;
    let history = evaluate(&mut env, table, EVAL_EPISODES, &mut rng)?;
    info!(
        "Greedy policy reached the goal in {}/{} episodes",
        history.success_count(),
        EVAL_EPISODES
    );

    Ok(())
}
