use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SEED, DEFAULT_TRIALS, DEFENDER_EFG_FLOOR, FULL_GAME_SCALE, GAME_MINUTES,
    LEAGUE_AVG_EFG, PTS_STD_PER_FGA, RECENT_GAMES, SEGMENT_FRACTION, TOP_TEAMMATES,
};
use crate::error::{ProjectionError, Result};
use crate::factors::FallbackPolicy;
use crate::game_log::PlayerId;
use crate::player::TeamId;

/// Heuristic coefficients of the projection model.
///
/// The segment fraction and the full-game scale have no calibration behind
/// them; they are exposed so they can be tuned against evaluation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    pub recent_games: usize,
    pub top_teammates: usize,
    pub league_avg_efg: f64,
    pub defender_efg_floor: f64,
    pub game_minutes: f64,
    pub segment_fraction: f64,
    pub full_game_scale: f64,
    pub pts_std_per_fga: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        ModelConstants {
            recent_games: RECENT_GAMES,
            top_teammates: TOP_TEAMMATES,
            league_avg_efg: LEAGUE_AVG_EFG,
            defender_efg_floor: DEFENDER_EFG_FLOOR,
            game_minutes: GAME_MINUTES,
            segment_fraction: SEGMENT_FRACTION,
            full_game_scale: FULL_GAME_SCALE,
            pts_std_per_fga: PTS_STD_PER_FGA,
        }
    }
}

impl ModelConstants {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("league_avg_efg", self.league_avg_efg),
            ("defender_efg_floor", self.defender_efg_floor),
            ("game_minutes", self.game_minutes),
            ("segment_fraction", self.segment_fraction),
            ("full_game_scale", self.full_game_scale),
            ("pts_std_per_fga", self.pts_std_per_fga),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("model.{} must be positive, got {}", name, value)));
            }
        }
        if self.recent_games == 0 {
            return Err(invalid("model.recent_games must be at least 1"));
        }
        if self.segment_fraction > 1.0 {
            return Err(invalid("model.segment_fraction cannot exceed 1"));
        }
        Ok(())
    }
}

/// Which team of the configured matchup a target player belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Opponent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPlayer {
    pub id: PlayerId,
    #[serde(default)]
    pub name: Option<String>,
    pub side: Side,
}

/// Everything one matchup run needs: teams, targets, sampling and model knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub home_team: TeamId,
    pub opponent_team: TeamId,
    #[serde(default)]
    pub home_label: Option<String>,
    #[serde(default)]
    pub opponent_label: Option<String>,
    #[serde(default)]
    pub targets: Vec<TargetPlayer>,
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Minimum spacing between data-source calls, in milliseconds
    #[serde(default)]
    pub rate_limit_ms: u64,
    #[serde(default)]
    pub model: ModelConstants,
    #[serde(default)]
    pub fallbacks: FallbackPolicy,
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn invalid(message: impl Into<String>) -> ProjectionError {
    ProjectionError::InvalidConfig {
        message: message.into(),
    }
}

impl SimulationConfig {
    pub fn new(home_team: TeamId, opponent_team: TeamId) -> Self {
        SimulationConfig {
            home_team,
            opponent_team,
            home_label: None,
            opponent_label: None,
            targets: Vec::new(),
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            rate_limit_ms: 0,
            model: ModelConstants::default(),
            fallbacks: FallbackPolicy::default(),
        }
    }

    pub fn with_target(mut self, id: PlayerId, side: Side) -> Self {
        self.targets.push(TargetPlayer { id, name: None, side });
        self
    }

    pub fn with_trials(mut self, trials: usize, seed: u64) -> Self {
        self.trials = trials;
        self.seed = seed;
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.home_team == self.opponent_team {
            return Err(invalid("home_team and opponent_team must differ"));
        }
        if self.targets.is_empty() {
            return Err(invalid("at least one target player is required"));
        }
        if self.trials == 0 {
            return Err(invalid("trials must be at least 1"));
        }
        self.model.validate()
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// `(own team, opposing team)` for a side.
    pub fn teams_for(&self, side: Side) -> (TeamId, TeamId) {
        match side {
            Side::Home => (self.home_team, self.opponent_team),
            Side::Opponent => (self.opponent_team, self.home_team),
        }
    }

    /// Display label for a side, falling back to the team id.
    pub fn label_for(&self, side: Side) -> String {
        let (label, team) = match side {
            Side::Home => (&self.home_label, self.home_team),
            Side::Opponent => (&self.opponent_label, self.opponent_team),
        };
        label.clone().unwrap_or_else(|| team.to_string())
    }
}
