//! Python bindings.
//!
//! The Python side owns fetching (it talks to the stats API); it fills a
//! [`GameLogStore`] and hands it to [`project_matchup`] together with a TOML
//! matchup config.

use chrono::NaiveDate;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::config::SimulationConfig;
use crate::error::ProjectionError;
use crate::game_log::{GameLogRow, Minutes, PlayerId};
use crate::player::{PlayerProfile, TeamId};
use crate::pipeline::ProjectionPipeline;
use crate::projection::{Projection, StatLine};
use crate::repository::{InMemoryRepository, TeamSeasonStats};
use crate::simulation::MonteCarloSimulator;

impl From<ProjectionError> for PyErr {
    fn from(err: ProjectionError) -> PyErr {
        match err {
            ProjectionError::Io(e) => PyIOError::new_err(e.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Minutes as the stats API reports them: a number or "MM:SS".
#[derive(FromPyObject)]
enum MinutesArg {
    Number(f64),
    Text(String),
}

impl MinutesArg {
    fn parse(self) -> PyResult<Minutes> {
        match self {
            MinutesArg::Number(m) => Ok(Minutes::new(m)),
            MinutesArg::Text(s) => s.parse().map_err(|e| PyValueError::new_err(format!("{}", e))),
        }
    }
}

/// Accepts ISO dates and the API's "JUN 01, 2025" form.
fn parse_game_date(raw: &str) -> PyResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%b %d, %Y"))
        .map_err(|_| PyValueError::new_err(format!("unrecognized game date: {:?}", raw)))
}

/// In-memory box-score store filled from Python.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct GameLogStore {
    inner: InMemoryRepository,
}

#[pymethods]
impl GameLogStore {
    #[new]
    pub fn new() -> Self {
        Self::default()
    }

    #[pyo3(signature = (
        player_id, game_date, minutes,
        pts = 0.0, reb = 0.0, ast = 0.0,
        fgm = 0.0, fga = 0.0, fg3m = 0.0, ftm = 0.0, fta = 0.0, tov = 0.0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn add_game(
        &mut self,
        player_id: PlayerId,
        game_date: &str,
        minutes: MinutesArg,
        pts: f64,
        reb: f64,
        ast: f64,
        fgm: f64,
        fga: f64,
        fg3m: f64,
        ftm: f64,
        fta: f64,
        tov: f64,
    ) -> PyResult<()> {
        let row = GameLogRow {
            minutes: minutes.parse()?,
            ..GameLogRow::new(parse_game_date(game_date)?, 0.0)
        }
        .with_box(pts, reb, ast)
        .with_shooting(fgm, fga, fg3m, ftm, fta)
        .with_turnovers(tov);

        self.inner.add_game(player_id, row);
        Ok(())
    }

    /// Register a player; also appends them to `team_id`'s roster.
    #[pyo3(signature = (player_id, name, team_id, height = None, position = None))]
    fn add_player(
        &mut self,
        player_id: PlayerId,
        name: String,
        team_id: TeamId,
        height: Option<&str>,
        position: Option<&str>,
    ) {
        self.inner
            .add_player(PlayerProfile::from_source(player_id, name, height, position, team_id));
    }

    /// Replace a team's roster order.
    fn set_roster(&mut self, team_id: TeamId, players: Vec<PlayerId>) {
        self.inner.set_roster(team_id, players);
    }

    /// Per-game aggregates of `team_id` in games against `opponent_id`.
    fn set_team_stats(
        &mut self,
        team_id: TeamId,
        opponent_id: TeamId,
        fga: f64,
        fta: f64,
        oreb: f64,
        tov: f64,
    ) {
        let stats = TeamSeasonStats::new(fga, fta, oreb, tov);
        self.inner.set_team_stats(team_id, opponent_id, stats);
    }

    fn __len__(&self) -> usize {
        self.inner.player_count()
    }

    fn __repr__(&self) -> String {
        format!("GameLogStore({} players)", self.inner.player_count())
    }
}

/// Run a configured matchup against a store.
///
/// Returns `(combined_csv, projection_json, failures)` where `failures` holds
/// `(player_id, reason)` for every target that could not be projected.
#[pyfunction]
pub fn project_matchup(
    py: Python<'_>,
    store: &GameLogStore,
    config_toml: &str,
) -> PyResult<(String, Vec<String>, Vec<(PlayerId, String)>)> {
    let config = SimulationConfig::from_toml_str(config_toml)?;
    let repo = store.inner.clone();

    py.allow_threads(move || {
        let outcome = ProjectionPipeline::rate_limited(repo, config).run();

        let mut csv = Vec::new();
        outcome.write_csv(&mut csv)?;
        let records = outcome
            .records()
            .map(|r| r.to_json())
            .collect::<Result<Vec<_>, _>>()?;
        let failures = outcome
            .failures
            .iter()
            .map(|(id, e)| (*id, e.to_string()))
            .collect();

        Ok((String::from_utf8_lossy(&csv).into_owned(), records, failures))
    })
}

/// Sample PTS/REB/AST rows from explicit (mean, std) pairs.
#[pyfunction]
#[pyo3(signature = (pts, reb, ast, trials = 20_000, seed = 42))]
pub fn simulate_stats(
    py: Python<'_>,
    pts: (f64, f64),
    reb: (f64, f64),
    ast: (f64, f64),
    trials: usize,
    seed: u64,
) -> Vec<(f64, f64, f64)> {
    let projection = Projection {
        pts: StatLine::new(pts.0, pts.1),
        reb: StatLine::new(reb.0, reb.1),
        ast: StatLine::new(ast.0, ast.1),
    };
    py.allow_threads(|| {
        MonteCarloSimulator::new(trials, seed)
            .simulate(0, &projection)
            .rows()
            .map(|r| (r.pts, r.reb, r.ast))
            .collect()
    })
}

/// Possessions from `(fga, fta, oreb, tov)` of each team against the other.
#[pyfunction]
pub fn estimate_possessions(
    team: (f64, f64, f64, f64),
    opponent: (f64, f64, f64, f64),
) -> PyResult<f64> {
    let stats = |(fga, fta, oreb, tov): (f64, f64, f64, f64)| {
        TeamSeasonStats::new(fga, fta, oreb, tov)
    };
    crate::possessions::estimate_possessions(&stats(team), &stats(opponent))
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pyfunction]
pub fn usage_multiplier(avg_teammate_usage: f64) -> f64 {
    crate::constants::usage_multiplier(avg_teammate_usage)
}

/// Inches from "feet-inches"; 72 when missing or malformed.
#[pyfunction]
#[pyo3(signature = (height = None))]
pub fn parse_height(height: Option<&str>) -> f64 {
    crate::player::parse_height(height)
}
