//! Error types for matchup projection.
//!
//! Lookup and factor faults are recovered close to where they happen (see
//! [`crate::factors::FallbackPolicy`]). Only [`ProjectionError`] reaches callers.

use thiserror::Error;

use crate::game_log::PlayerId;
use crate::player::TeamId;

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// A repository lookup that came back empty or failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MissingData {
    #[error("no game log for player {0}")]
    GameLog(PlayerId),

    #[error("no profile for player {0}")]
    Profile(PlayerId),

    #[error("no roster for team {0}")]
    Roster(TeamId),

    #[error("no season stats for team {team} against {opponent}")]
    TeamStats { team: TeamId, opponent: TeamId },
}

/// Why a single factor could not be computed from its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactorFault {
    #[error(transparent)]
    Missing(#[from] MissingData),

    #[error("no usable inputs: {0}")]
    Empty(&'static str),

    #[error("degenerate denominator: {0}")]
    Degenerate(&'static str),
}

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("projection unavailable for player {player}: no season data")]
    Unavailable { player: PlayerId },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}
