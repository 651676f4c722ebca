//! Matchup adjustment factors.
//!
//! Each factor is computed by a pure function returning
//! `Result<f64, FactorFault>`. [`FallbackPolicy`] turns a fault into the
//! factor's neutral value, so missing data never escapes a single factor.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ModelConstants;
use crate::constants::{
    usage_multiplier, DEFAULT_HEIGHT_IN, DEFAULT_POSSESSIONS, REB_FACTOR_MAX, REB_FACTOR_MIN,
};
use crate::error::FactorFault;
use crate::game_log::{RecentForm, Stat};
use crate::player::PlayerProfile;

/// Named quantities that have a fallback value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Possessions,
    UsageRate,
    UsageMultiplier,
    EffectiveFg,
    AssistFactor,
    ReboundFactor,
    FreeThrowPct,
    SegmentMinutes,
}

/// Neutral values substituted when a factor cannot be computed.
///
/// A missing eFG% falls back to [`ModelConstants::league_avg_efg`], the same
/// league average the adjusted-eFG and assist formulas divide by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    pub possessions: f64,
    pub usage_rate: f64,
    pub usage_multiplier: f64,
    pub assist_factor: f64,
    pub rebound_factor: f64,
    pub ft_pct: f64,
    pub segment_minutes: f64,
    pub pts_std: f64,
    pub reb_std: f64,
    pub ast_std: f64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy {
            possessions: DEFAULT_POSSESSIONS,
            usage_rate: 0.2,
            usage_multiplier: 1.0,
            assist_factor: 1.0,
            rebound_factor: 1.0,
            ft_pct: 0.8,
            segment_minutes: 8.0,
            pts_std: 3.0,
            reb_std: 1.5,
            ast_std: 1.0,
        }
    }
}

impl FallbackPolicy {
    pub fn value(&self, factor: Factor, model: &ModelConstants) -> f64 {
        match factor {
            Factor::Possessions => self.possessions,
            Factor::UsageRate => self.usage_rate,
            Factor::UsageMultiplier => self.usage_multiplier,
            Factor::EffectiveFg => model.league_avg_efg,
            Factor::AssistFactor => self.assist_factor,
            Factor::ReboundFactor => self.rebound_factor,
            Factor::FreeThrowPct => self.ft_pct,
            Factor::SegmentMinutes => self.segment_minutes,
        }
    }

    /// Standard deviation used when the window has fewer than two games.
    pub fn std_dev(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Pts => self.pts_std,
            Stat::Reb => self.reb_std,
            Stat::Ast => self.ast_std,
        }
    }

    /// The computed value, or the factor's fallback on any fault.
    pub fn resolve(
        &self,
        factor: Factor,
        computed: Result<f64, FactorFault>,
        model: &ModelConstants,
    ) -> f64 {
        match computed {
            Ok(value) => value,
            Err(fault) => {
                let fallback = self.value(factor, model);
                debug!(?factor, %fault, fallback, "using fallback");
                fallback
            }
        }
    }
}

/// Base usage: possessions a player uses per team possession.
pub fn base_usage(form: Option<&RecentForm>, team_possessions: f64) -> Result<f64, FactorFault> {
    let form = form.ok_or(FactorFault::Empty("no recent games"))?;
    if team_possessions <= 0.0 {
        return Err(FactorFault::Degenerate("team possessions"));
    }
    Ok(form.possessions_used() / team_possessions)
}

/// Multiplier from the mean usage of the positive-usage teammates.
pub fn teammate_usage_multiplier(teammate_usages: &[f64]) -> Result<f64, FactorFault> {
    let valid: Vec<f64> = teammate_usages.iter().copied().filter(|&u| u > 0.0).collect();
    if valid.is_empty() {
        return Err(FactorFault::Empty("no teammate usage"));
    }
    let avg = valid.iter().sum::<f64>() / valid.len() as f64;
    Ok(usage_multiplier(avg))
}

pub fn effective_fg(form: Option<&RecentForm>) -> Result<f64, FactorFault> {
    form.ok_or(FactorFault::Empty("no recent games"))?
        .effective_fg()
        .ok_or(FactorFault::Degenerate("no field-goal attempts"))
}

/// Teammate finishing quality relative to the league.
pub fn assist_factor(teammate_efgs: &[f64], league_avg_efg: f64) -> Result<f64, FactorFault> {
    let valid: Vec<f64> = teammate_efgs.iter().copied().filter(|&e| e > 0.0).collect();
    if valid.is_empty() {
        return Err(FactorFault::Empty("no teammate shooting"));
    }
    let avg = valid.iter().sum::<f64>() / valid.len() as f64;
    Ok(avg / league_avg_efg)
}

/// Rebounding opportunity from lineup size and height.
///
/// Guards on a lineup without bigs get +0.2; forwards next to exactly one big
/// get +0.1. Height relative to teammates counts per 24 inches, relative to
/// the opposing lineup per 36. Clamped to [0.85, 1.20].
pub fn rebound_factor(
    player: &PlayerProfile,
    teammates: &[PlayerProfile],
    opponents: &[PlayerProfile],
) -> Result<f64, FactorFault> {
    if teammates.is_empty() {
        return Err(FactorFault::Empty("no on-court teammates"));
    }

    let avg_teammate_height = mean(teammates.iter().map(|t| t.height)).unwrap_or(DEFAULT_HEIGHT_IN);
    let avg_opponent_height = mean(opponents.iter().map(|o| o.height)).unwrap_or(DEFAULT_HEIGHT_IN);
    let bigs = teammates.iter().filter(|t| t.is_big()).count();

    let mut factor = 1.0;
    if player.plays_guard() && bigs == 0 {
        factor += 0.2;
    } else if player.plays_forward() && bigs == 1 {
        factor += 0.1;
    }
    factor += (player.height - avg_teammate_height) / 24.0;
    factor += (player.height - avg_opponent_height) / 36.0;

    Ok(clamp_rebound_factor(factor))
}

pub fn clamp_rebound_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        return 1.0;
    }
    factor.clamp(REB_FACTOR_MIN, REB_FACTOR_MAX)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// A teammate or opponent as seen by the factor code.
#[derive(Clone, Debug)]
pub struct LineupMember {
    pub profile: PlayerProfile,
    pub form: Option<RecentForm>,
}

/// Everything the factors for one player depend on.
#[derive(Clone, Debug)]
pub struct FactorInputs<'a> {
    pub form: &'a RecentForm,
    pub profile: &'a PlayerProfile,
    pub team_possessions: f64,
    pub teammates: &'a [LineupMember],
    /// `None` when the opposing roster ran out of defenders
    pub defender_form: Option<&'a RecentForm>,
    pub has_defender: bool,
    /// The defender's own top teammates: the opposing lineup
    pub defender_teammates: &'a [LineupMember],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    pub usage_rate: f64,
    pub usage_multiplier: f64,
    pub player_efg: f64,
    pub defender_efg: f64,
    pub adj_efg: f64,
    pub teammate_ast_factor: f64,
    pub defender_ast_factor: f64,
    pub reb_factor: f64,
    pub segment_minutes: f64,
    /// Factors that fell back to their neutral value
    pub fallbacks: Vec<Factor>,
}

pub struct FactorCalculator<'a> {
    constants: &'a ModelConstants,
    policy: &'a FallbackPolicy,
}

impl<'a> FactorCalculator<'a> {
    pub fn new(constants: &'a ModelConstants, policy: &'a FallbackPolicy) -> Self {
        FactorCalculator { constants, policy }
    }

    /// Projected minutes inside the modeled segment.
    pub fn segment_minutes(&self, form: &RecentForm) -> Result<f64, FactorFault> {
        if form.minutes <= 0.0 {
            return Err(FactorFault::Degenerate("no minutes logged"));
        }
        Ok(form.mean_minutes() * self.constants.segment_fraction)
    }

    /// `player_eFG * league / max(defender_eFG, floor)`
    pub fn adjusted_efg(&self, player_efg: f64, defender_efg: f64) -> f64 {
        let defender_efg = defender_efg.max(self.constants.defender_efg_floor);
        player_efg * (self.constants.league_avg_efg / defender_efg)
    }

    fn fallback(&self, factor: Factor, computed: Result<f64, FactorFault>) -> f64 {
        self.policy.resolve(factor, computed, self.constants)
    }

    fn member_usage(&self, member: &LineupMember, team_possessions: f64) -> f64 {
        self.fallback(
            Factor::UsageRate,
            base_usage(member.form.as_ref(), team_possessions),
        )
    }

    fn member_efg(&self, member: &LineupMember) -> f64 {
        self.fallback(Factor::EffectiveFg, effective_fg(member.form.as_ref()))
    }

    fn lineup_assist_factor(&self, lineup: &[LineupMember]) -> Result<f64, FactorFault> {
        let efgs: Vec<f64> = lineup.iter().map(|m| self.member_efg(m)).collect();
        assist_factor(&efgs, self.constants.league_avg_efg)
    }

    pub fn compute(&self, inputs: &FactorInputs<'_>) -> AdjustmentFactors {
        let mut fallbacks = Vec::new();
        let mut resolve = |factor: Factor, computed: Result<f64, FactorFault>| {
            if computed.is_err() {
                fallbacks.push(factor);
            }
            self.fallback(factor, computed)
        };

        let usages: Vec<f64> = inputs
            .teammates
            .iter()
            .map(|m| self.member_usage(m, inputs.team_possessions))
            .collect();
        let base = resolve(
            Factor::UsageRate,
            base_usage(Some(inputs.form), inputs.team_possessions),
        );
        let usage_multiplier = resolve(Factor::UsageMultiplier, teammate_usage_multiplier(&usages));

        let player_efg = resolve(Factor::EffectiveFg, effective_fg(Some(inputs.form)));
        let defender_efg = if inputs.has_defender {
            resolve(Factor::EffectiveFg, effective_fg(inputs.defender_form))
        } else {
            self.constants.league_avg_efg
        };

        let teammate_ast_factor = resolve(
            Factor::AssistFactor,
            self.lineup_assist_factor(inputs.teammates),
        );
        let defender_ast_factor = if inputs.has_defender {
            resolve(
                Factor::AssistFactor,
                self.lineup_assist_factor(inputs.defender_teammates),
            )
        } else {
            self.policy.assist_factor
        };

        let teammate_profiles: Vec<PlayerProfile> =
            inputs.teammates.iter().map(|m| m.profile.clone()).collect();
        let opponent_profiles: Vec<PlayerProfile> = inputs
            .defender_teammates
            .iter()
            .map(|m| m.profile.clone())
            .collect();
        let reb_factor = resolve(
            Factor::ReboundFactor,
            rebound_factor(inputs.profile, &teammate_profiles, &opponent_profiles),
        );

        let segment_minutes = resolve(Factor::SegmentMinutes, self.segment_minutes(inputs.form));

        AdjustmentFactors {
            usage_rate: base * usage_multiplier,
            usage_multiplier,
            player_efg,
            defender_efg,
            adj_efg: self.adjusted_efg(player_efg, defender_efg),
            teammate_ast_factor,
            defender_ast_factor,
            reb_factor,
            segment_minutes,
            fallbacks,
        }
    }
}
