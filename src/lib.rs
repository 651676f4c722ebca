//! Hoops Sim Core - matchup-adjusted player projections and Monte Carlo sampling.
//!
//! Turns a player's recent box scores into matchup-adjusted (mean, std)
//! projections for points, rebounds and assists, then samples them into an
//! empirical outcome table. Python bindings via PyO3 are available behind the
//! `python` feature.

pub mod affinity;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod factors;
pub mod game_log;
pub mod logging;
pub mod matchup;
pub mod pipeline;
pub mod player;
pub mod possessions;
pub mod projection;
pub mod repository;
pub mod simulation;
pub mod summary;

#[cfg(feature = "python")]
pub mod python;

pub use affinity::{SharedMinutesMatrix, TeammateAffinityEngine};
pub use config::{ModelConstants, Side, SimulationConfig, TargetPlayer};
pub use constants::{usage_multiplier, DEFAULT_SEED, DEFAULT_TRIALS, LEAGUE_AVG_EFG};
pub use error::{FactorFault, MissingData, ProjectionError, Result};
pub use evaluation::{evaluate, ActualLine, Evaluation, Grade, Prediction};
pub use factors::{AdjustmentFactors, Factor, FactorCalculator, FallbackPolicy};
pub use game_log::{GameLogRow, Minutes, PlayerId, RecentForm, Stat};
pub use matchup::{MatchupAssigner, MatchupAssignment, RosterEntry};
pub use pipeline::{BatchOutcome, PlayerSimulation, ProjectionPipeline};
pub use player::{parse_height, PlayerProfile, Position, TeamId};
pub use possessions::{estimate_possessions, PossessionEstimator};
pub use projection::{Projection, ProjectionBuilder, ProjectionRecord, StatLine};
pub use repository::{GameLogRepository, InMemoryRepository, Memoized, RateLimited, TeamSeasonStats};
pub use simulation::{MonteCarloSimulator, SimulationTrialSet, TrialRow};
pub use summary::StatSummary;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition
#[cfg(feature = "python")]
#[pymodule]
fn hoops_sim_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    logging::init("warn");

    // Classes
    m.add_class::<python::GameLogStore>()?;

    // Pipeline
    m.add_function(wrap_pyfunction!(python::project_matchup, m)?)?;
    m.add_function(wrap_pyfunction!(python::simulate_stats, m)?)?;

    // Building blocks
    m.add_function(wrap_pyfunction!(python::estimate_possessions, m)?)?;
    m.add_function(wrap_pyfunction!(python::usage_multiplier, m)?)?;
    m.add_function(wrap_pyfunction!(python::parse_height, m)?)?;

    // Constants
    m.add("DEFAULT_TRIALS", DEFAULT_TRIALS)?;
    m.add("DEFAULT_SEED", DEFAULT_SEED)?;
    m.add("LEAGUE_AVG_EFG", LEAGUE_AVG_EFG)?;

    Ok(())
}
