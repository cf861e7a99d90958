mod engine;
mod error;
mod stats;
mod types;

pub use engine::{run_simulation, run_simulation_seeded};
pub use error::SimulationError;
pub use stats::{histogram, percentile, summarize};
pub use types::{Histogram, SimulationParameters, SimulationResult, SummaryStatistics, WealthPath};
