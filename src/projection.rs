use serde::{Deserialize, Serialize};

use crate::config::ModelConstants;
use crate::error::Result;
use crate::factors::{AdjustmentFactors, Factor, FallbackPolicy};
use crate::game_log::{PlayerId, RecentForm, Stat};

/// Mean and standard deviation of one projected stat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub mean: f64,
    pub std: f64,
}

impl StatLine {
    pub fn new(mean: f64, std: f64) -> Self {
        StatLine { mean, std }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub pts: StatLine,
    pub reb: StatLine,
    pub ast: StatLine,
}

impl Projection {
    pub fn get(&self, stat: Stat) -> StatLine {
        match stat {
            Stat::Pts => self.pts,
            Stat::Reb => self.reb,
            Stat::Ast => self.ast,
        }
    }
}

/// Full projection output for one player, ready for persistence or evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub player_id: PlayerId,
    pub defender_id: Option<PlayerId>,
    pub team_possessions: f64,
    pub segment_minutes: f64,
    pub usage_rate: f64,
    pub adj_efg: f64,
    pub ft_pct: f64,
    pub est_fga: f64,
    pub est_fta: f64,
    pub projection: Projection,
    pub factors: AdjustmentFactors,
    /// No defender could be assigned, so defender-dependent factors are neutral
    pub low_confidence: bool,
}

impl ProjectionRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Expected points: two per effective make plus made free throws.
pub fn points_mean(est_fga: f64, adj_efg: f64, est_fta: f64, ft_pct: f64) -> f64 {
    est_fga * adj_efg * 2.0 + est_fta * ft_pct
}

/// Combines rolling form and adjustment factors into per-stat distributions.
///
/// Shot volume is estimated for one segment and scaled back up to a full game
/// with `full_game_scale` (4 by default).
pub struct ProjectionBuilder<'a> {
    constants: &'a ModelConstants,
    policy: &'a FallbackPolicy,
}

impl<'a> ProjectionBuilder<'a> {
    pub fn new(constants: &'a ModelConstants, policy: &'a FallbackPolicy) -> Self {
        ProjectionBuilder { constants, policy }
    }

    pub fn segment_possessions(&self, team_possessions: f64, segment_minutes: f64) -> f64 {
        team_possessions * (segment_minutes / self.constants.game_minutes)
    }

    pub fn estimated_fga(&self, segment_possessions: f64, usage_rate: f64) -> f64 {
        segment_possessions * usage_rate * self.constants.full_game_scale
    }

    pub fn estimated_fta(&self, form: &RecentForm, segment_minutes: f64) -> f64 {
        form.fta_per_minute() * segment_minutes * self.constants.full_game_scale
    }

    fn std_dev(&self, form: &RecentForm, stat: Stat) -> f64 {
        form.std_dev(stat).unwrap_or_else(|| self.policy.std_dev(stat))
    }

    pub fn build(
        &self,
        player_id: PlayerId,
        defender_id: Option<PlayerId>,
        form: &RecentForm,
        factors: &AdjustmentFactors,
        team_possessions: f64,
    ) -> ProjectionRecord {
        let segment_minutes = factors.segment_minutes;
        let segment_possessions = self.segment_possessions(team_possessions, segment_minutes);
        let est_fga = self.estimated_fga(segment_possessions, factors.usage_rate);
        let est_fta = self.estimated_fta(form, segment_minutes);
        let ft_pct = form
            .ft_pct()
            .unwrap_or_else(|| self.policy.value(Factor::FreeThrowPct, self.constants));

        let pts_std = self
            .std_dev(form, Stat::Pts)
            .min(est_fga * self.constants.pts_std_per_fga)
            .max(0.0);

        let projection = Projection {
            pts: StatLine::new(points_mean(est_fga, factors.adj_efg, est_fta, ft_pct), pts_std),
            reb: StatLine::new(
                form.mean(Stat::Reb) * factors.reb_factor,
                self.std_dev(form, Stat::Reb),
            ),
            ast: StatLine::new(
                form.mean(Stat::Ast) * factors.teammate_ast_factor * factors.defender_ast_factor,
                self.std_dev(form, Stat::Ast),
            ),
        };

        ProjectionRecord {
            player_id,
            defender_id,
            team_possessions,
            segment_minutes,
            usage_rate: factors.usage_rate,
            adj_efg: factors.adj_efg,
            ft_pct,
            est_fga,
            est_fta,
            projection,
            factors: factors.clone(),
            low_confidence: defender_id.is_none(),
        }
    }
}
