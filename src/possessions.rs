use tracing::debug;

use crate::constants::FTA_POSSESSION_WEIGHT;
use crate::error::FactorFault;
use crate::player::TeamId;
use crate::repository::{GameLogRepository, TeamSeasonStats};

/// Possessions one team uses per game: FGA + 0.44 * FTA - OREB + TOV.
pub fn team_possessions(stats: &TeamSeasonStats) -> f64 {
    stats.fga + FTA_POSSESSION_WEIGHT * stats.fta - stats.oreb + stats.tov
}

/// Average of both teams' possession counts.
///
/// `team` must be `team`'s line against `opponent` and vice versa; the
/// estimate is only symmetric if those lines are swapped along with the labels.
pub fn estimate_possessions(
    team: &TeamSeasonStats,
    opponent: &TeamSeasonStats,
) -> Result<f64, FactorFault> {
    if team.fga <= 0.0 || opponent.fga <= 0.0 {
        return Err(FactorFault::Degenerate("team has no field-goal attempts"));
    }
    let possessions = 0.5 * (team_possessions(team) + team_possessions(opponent));
    if !possessions.is_finite() || possessions <= 0.0 {
        return Err(FactorFault::Degenerate("non-positive possession estimate"));
    }
    Ok(possessions)
}

/// Per-game possession estimate for a matchup, from opponent-conditioned
/// team aggregates.
pub struct PossessionEstimator<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R: GameLogRepository + ?Sized> PossessionEstimator<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        PossessionEstimator { repo }
    }

    /// Query both directions (team vs opponent, opponent vs team) and combine.
    pub fn estimate(&self, team: TeamId, opponent: TeamId) -> Result<f64, FactorFault> {
        let ours = self.repo.team_stats(team, opponent)?;
        let theirs = self.repo.team_stats(opponent, team)?;
        let possessions = estimate_possessions(&ours, &theirs)?;
        debug!(team, opponent, possessions, "estimated possessions");
        Ok(possessions)
    }
}
