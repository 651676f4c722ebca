//! End-to-end matchup projection.
//!
//! Wires the repository through teammate affinity, defender assignment,
//! possessions, factors and projection, then samples each target player.
//! The pipeline is sequential; only the sampler fans out onto rayon.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::affinity::TeammateAffinityEngine;
use crate::config::{SimulationConfig, TargetPlayer};
use crate::error::{ProjectionError, Result};
use crate::evaluation::Prediction;
use crate::factors::{Factor, FactorCalculator, FactorInputs, LineupMember};
use crate::game_log::{PlayerId, RecentForm};
use crate::matchup::{MatchupAssigner, RosterEntry};
use crate::player::{PlayerProfile, TeamId};
use crate::possessions::PossessionEstimator;
use crate::projection::{ProjectionBuilder, ProjectionRecord};
use crate::repository::{GameLogRepository, Memoized, RateLimited};
use crate::simulation::{MonteCarloSimulator, SimulationTrialSet};

/// Projection and simulated outcomes for one target player.
#[derive(Clone, Debug)]
pub struct PlayerSimulation {
    pub player_label: String,
    pub team_label: String,
    pub record: ProjectionRecord,
    pub trials: SimulationTrialSet,
}

impl PlayerSimulation {
    pub fn prediction(&self) -> Option<Prediction> {
        Prediction::from_trials(self.player_label.clone(), &self.trials)
    }
}

/// Result of a batch run: every player that projected, and every one that did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub simulations: Vec<PlayerSimulation>,
    pub failures: Vec<(PlayerId, ProjectionError)>,
}

impl BatchOutcome {
    pub fn records(&self) -> impl Iterator<Item = &ProjectionRecord> {
        self.simulations.iter().map(|s| &s.record)
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.simulations.iter().filter_map(|s| s.prediction()).collect()
    }

    /// All players' trials in one table: `PLAYER,TEAM,PTS,REB,AST`.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        write_combined_csv(&self.simulations, out)
    }
}

const COMBINED_HEADER: [&str; 5] = ["PLAYER", "TEAM", "PTS", "REB", "AST"];

#[derive(Serialize)]
struct CombinedRow<'a> {
    #[serde(rename = "PLAYER")]
    player: &'a str,
    #[serde(rename = "TEAM")]
    team: &'a str,
    #[serde(rename = "PTS")]
    pts: f64,
    #[serde(rename = "REB")]
    reb: f64,
    #[serde(rename = "AST")]
    ast: f64,
}

pub fn write_combined_csv<W: Write>(simulations: &[PlayerSimulation], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    if simulations.iter().all(|s| s.trials.is_empty()) {
        wtr.write_record(COMBINED_HEADER)?;
    }
    for sim in simulations {
        for row in sim.trials.rows() {
            wtr.serialize(CombinedRow {
                player: &sim.player_label,
                team: &sim.team_label,
                pts: row.pts,
                reb: row.reb,
                ast: row.ast,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Projects and simulates the configured target players.
///
/// Lookups go through a per-pipeline memo, so each player's log and profile
/// are fetched once no matter how many factors need them.
pub struct ProjectionPipeline<R> {
    repo: Memoized<R>,
    config: SimulationConfig,
}

impl<R: GameLogRepository> ProjectionPipeline<RateLimited<R>> {
    /// Pipeline whose lookups are spaced by the configured `rate_limit_ms`.
    pub fn rate_limited(repo: R, config: SimulationConfig) -> Self {
        let delay = config.rate_limit();
        ProjectionPipeline::new(RateLimited::new(repo, delay), config)
    }
}

impl<R: GameLogRepository> ProjectionPipeline<R> {
    pub fn new(repo: R, config: SimulationConfig) -> Self {
        ProjectionPipeline {
            repo: Memoized::new(repo),
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn recent_form(&self, player: PlayerId) -> Option<RecentForm> {
        match self.repo.game_log(player) {
            Ok(rows) => RecentForm::from_log(&rows, self.config.model.recent_games),
            Err(e) => {
                debug!(player, error = %e, "no recent form");
                None
            }
        }
    }

    fn profile(&self, player: PlayerId, team: TeamId) -> PlayerProfile {
        self.repo.profile(player).unwrap_or_else(|e| {
            debug!(player, error = %e, "using placeholder profile");
            PlayerProfile::unknown(player, team)
        })
    }

    fn roster_entries(&self, team: TeamId) -> Vec<RosterEntry> {
        let roster = self.repo.roster(team).unwrap_or_else(|e| {
            warn!(team, error = %e, "roster unavailable");
            Vec::new()
        });

        roster
            .into_iter()
            .map(|id| {
                let impact = self.recent_form(id).map_or(0.0, |f| f.impact_score());
                RosterEntry::new(&self.profile(id, team), impact)
            })
            .collect()
    }

    fn lineup(&self, players: &[PlayerId], team: TeamId) -> Vec<LineupMember> {
        players
            .iter()
            .map(|&id| LineupMember {
                profile: self.profile(id, team),
                form: self.recent_form(id),
            })
            .collect()
    }

    /// Project one player's PTS, REB and AST for the configured matchup.
    ///
    /// Only a player without any game log fails; every other gap falls back
    /// to a neutral factor value.
    pub fn project_player(&self, target: &TargetPlayer) -> Result<ProjectionRecord> {
        self.project(target).map(|(record, _)| record)
    }

    fn project(&self, target: &TargetPlayer) -> Result<(ProjectionRecord, PlayerProfile)> {
        let unavailable = || ProjectionError::Unavailable { player: target.id };
        let (team, opponent) = self.config.teams_for(target.side);
        let model = &self.config.model;
        let policy = &self.config.fallbacks;

        let log = self.repo.game_log(target.id).map_err(|_| unavailable())?;
        let form = RecentForm::from_log(&log, model.recent_games).ok_or_else(unavailable)?;
        let profile = self.profile(target.id, team);

        let estimated = PossessionEstimator::new(&self.repo).estimate(team, opponent);
        let possessions_fell_back = estimated.is_err();
        let team_possessions = policy.resolve(Factor::Possessions, estimated, model);

        let mut home = self.roster_entries(team);
        if !home.iter().any(|e| e.id == target.id) {
            home.push(RosterEntry::new(&profile, form.impact_score()));
        }
        let away = self.roster_entries(opponent);
        let assignment = MatchupAssigner::new().assign(&home, &away);
        let defender = assignment.defender_for(target.id);

        let engine = TeammateAffinityEngine::new(&self.repo, model.top_teammates);
        let teammates = self.lineup(&engine.on_court_teammates(target.id), team);

        let defender_form = defender.and_then(|d| self.recent_form(d));
        let defender_teammates = match defender {
            Some(d) => self.lineup(&engine.on_court_teammates(d), opponent),
            None => {
                warn!(player = target.id, "no defender available, projection is low confidence");
                Vec::new()
            }
        };

        let mut factors = FactorCalculator::new(model, policy).compute(&FactorInputs {
            form: &form,
            profile: &profile,
            team_possessions,
            teammates: &teammates,
            defender_form: defender_form.as_ref(),
            has_defender: defender.is_some(),
            defender_teammates: &defender_teammates,
        });
        if possessions_fell_back {
            factors.fallbacks.insert(0, Factor::Possessions);
        }

        let builder = ProjectionBuilder::new(model, policy);
        let record = builder.build(target.id, defender, &form, &factors, team_possessions);
        info!(
            player = target.id,
            defender = ?defender,
            pts = record.projection.pts.mean,
            reb = record.projection.reb.mean,
            ast = record.projection.ast.mean,
            "projected"
        );
        Ok((record, profile))
    }

    /// Project and sample one player.
    ///
    /// Every player is sampled from the configured seed, so the trials are a
    /// pure function of the projection, the seed and the trial count.
    pub fn simulate_player(&self, target: &TargetPlayer) -> Result<PlayerSimulation> {
        let (record, profile) = self.project(target)?;
        let trials = MonteCarloSimulator::new(self.config.trials, self.config.seed)
            .simulate(target.id, &record.projection);

        let player_label = target
            .name
            .clone()
            .or_else(|| (!profile.name.is_empty()).then(|| profile.name.clone()))
            .unwrap_or_else(|| target.id.to_string());

        Ok(PlayerSimulation {
            player_label,
            team_label: self.config.label_for(target.side),
            record,
            trials,
        })
    }

    /// Simulate every configured target. One player's failure never stops
    /// the batch; it is logged and collected.
    pub fn run(&self) -> BatchOutcome {
        info!(
            home = self.config.home_team,
            opponent = self.config.opponent_team,
            targets = self.config.targets.len(),
            trials = self.config.trials,
            "starting matchup simulation"
        );

        let mut outcome = BatchOutcome::default();
        for target in &self.config.targets {
            match self.simulate_player(target) {
                Ok(sim) => outcome.simulations.push(sim),
                Err(e) => {
                    warn!(player = target.id, error = %e, "skipping player");
                    outcome.failures.push((target.id, e));
                }
            }
        }

        info!(
            simulated = outcome.simulations.len(),
            skipped = outcome.failures.len(),
            "matchup simulation finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Side;
    use crate::game_log::{GameLogRow, Stat};
    use crate::repository::{InMemoryRepository, TeamSeasonStats};
    use chrono::NaiveDate;

    const HOME: TeamId = 1;
    const AWAY: TeamId = 2;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn add(repo: &mut InMemoryRepository, id: PlayerId, team: TeamId, pos: &str, pts: f64) {
        let label = format!("P{}", id);
        repo.add_player(PlayerProfile::from_source(id, label, Some("6-0"), Some(pos), team));
        let rows = (1..=10)
            .map(|d| {
                GameLogRow::new(day(d), 30.0)
                    .with_box(pts + (d % 2) as f64, 5.0, 3.0)
                    .with_shooting(6.0, 13.0, 1.0, 3.0, 4.0)
                    .with_turnovers(2.0)
            })
            .collect();
        repo.set_game_log(id, rows);
    }

    fn repo() -> InMemoryRepository {
        let mut repo = InMemoryRepository::new();
        for (i, pos) in ["G", "G", "F", "F", "C"].iter().enumerate() {
            add(&mut repo, 10 + i as PlayerId, HOME, pos, 20.0 - i as f64);
            add(&mut repo, 20 + i as PlayerId, AWAY, pos, 18.0 - i as f64);
        }
        let stats = TeamSeasonStats::new(68.0, 20.0, 9.0, 14.0);
        repo.set_team_stats(HOME, AWAY, stats);
        repo.set_team_stats(AWAY, HOME, stats);
        repo
    }

    fn config() -> SimulationConfig {
        SimulationConfig::new(HOME, AWAY)
            .with_target(10, Side::Home)
            .with_target(22, Side::Opponent)
            .with_trials(2_000, 42)
    }

    #[test]
    fn test_project_home_player() {
        let pipeline = ProjectionPipeline::new(repo(), config());
        let record = pipeline.project_player(&pipeline.config().targets[0]).unwrap();

        assert_eq!(record.defender_id, Some(20));
        assert!(!record.low_confidence);
        // 68 + 8.8 - 9 + 14
        assert!((record.team_possessions - 81.8).abs() < 1e-9);
        assert!((record.segment_minutes - 7.5).abs() < 1e-12);
        assert!(record.factors.fallbacks.is_empty());
        assert!(record.projection.pts.mean > 0.0);

        let factors = &record.factors;
        // Teammate usage (13 + 0.44 * 4 + 2) / 81.8 is in the 0.20 band
        assert_eq!(factors.usage_multiplier, 0.98);
        assert!((factors.player_efg - 0.5).abs() < 1e-12);
        assert!((factors.defender_efg - 0.5).abs() < 1e-12);
        assert!((factors.adj_efg - 0.52).abs() < 1e-12);
        assert!((factors.teammate_ast_factor - 0.5 / 0.52).abs() < 1e-12);
        assert!((factors.defender_ast_factor - 0.5 / 0.52).abs() < 1e-12);
        // Guard next to bigs, same height as everyone on the floor
        assert!((factors.reb_factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_opponent_target_swaps_rosters() {
        let pipeline = ProjectionPipeline::new(repo(), config());
        let record = pipeline.project_player(&pipeline.config().targets[1]).unwrap();
        // Forward 22 is guarded by the top home forward
        assert_eq!(record.defender_id, Some(12));
    }

    #[test]
    fn test_missing_log_is_unavailable() {
        let mut repo = repo();
        repo.set_game_log(10, Vec::new());
        let pipeline = ProjectionPipeline::new(repo, config());

        let err = pipeline.project_player(&pipeline.config().targets[0]).unwrap_err();
        assert!(matches!(err, ProjectionError::Unavailable { player: 10 }));
    }

    #[test]
    fn test_missing_team_stats_falls_back() {
        let mut repo = InMemoryRepository::new();
        add(&mut repo, 10, HOME, "G", 15.0);
        add(&mut repo, 20, AWAY, "G", 15.0);
        let pipeline = ProjectionPipeline::new(repo, config());

        let record = pipeline.project_player(&pipeline.config().targets[0]).unwrap();
        assert_eq!(record.team_possessions, 80.0);
        assert_eq!(record.factors.fallbacks[0], Factor::Possessions);
    }

    #[test]
    fn test_empty_opponent_roster_is_low_confidence() {
        let mut repo = InMemoryRepository::new();
        add(&mut repo, 10, HOME, "G", 15.0);
        let pipeline = ProjectionPipeline::new(repo, config());

        let record = pipeline.project_player(&pipeline.config().targets[0]).unwrap();
        assert_eq!(record.defender_id, None);
        assert!(record.low_confidence);
        assert_eq!(record.factors.defender_efg, 0.52);
    }

    #[test]
    fn test_run_collects_failures() {
        let config = config().with_target(99, Side::Home);
        let pipeline = ProjectionPipeline::new(repo(), config);
        let outcome = pipeline.run();

        assert_eq!(outcome.simulations.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, 99);
        assert_eq!(outcome.simulations[0].player_label, "P10");
        assert_eq!(outcome.simulations[1].team_label, "2");
        assert_eq!(outcome.simulations[0].trials.len(), 2_000);
        assert_eq!(outcome.predictions().len(), 2);
    }

    #[test]
    fn test_combined_csv() {
        let pipeline = ProjectionPipeline::new(repo(), config().with_trials(3, 1));
        let outcome = pipeline.run();

        let mut out = Vec::new();
        outcome.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PLAYER,TEAM,PTS,REB,AST");
        assert_eq!(lines.len(), 1 + 2 * 3);
        assert!(lines[1].starts_with("P10,1,"));
        assert!(lines[4].starts_with("P22,2,"));
    }

    #[test]
    fn test_combined_csv_quotes_labels() {
        let config = config().with_trials(1, 1);
        let mut outcome = ProjectionPipeline::new(repo(), config).run();
        outcome.simulations[0].player_label = "Smith, Jr.".to_string();
        outcome.simulations[0].team_label = "Line\rBreak".to_string();
        outcome.simulations[1].player_label = "A \"B\"".to_string();

        let mut out = Vec::new();
        outcome.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"Smith, Jr.\",\"Line\rBreak\","), "{}", text);
        assert!(text.contains("\"A \"\"B\"\"\",2,"), "{}", text);

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let labels: Vec<(String, String)> = rdr
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string())
            })
            .collect();
        assert_eq!(labels[0], ("Smith, Jr.".to_string(), "Line\rBreak".to_string()));
        assert_eq!(labels[1].0, "A \"B\"");
    }

    #[test]
    fn test_combined_csv_without_trials_is_header_only() {
        let mut out = Vec::new();
        BatchOutcome::default().write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "PLAYER,TEAM,PTS,REB,AST\n");
    }

    #[test]
    fn test_rate_limited_pipeline_projects() {
        let pipeline = ProjectionPipeline::rate_limited(repo(), config());
        let sim = pipeline.simulate_player(&pipeline.config().targets[0]).unwrap();
        assert!(sim.trials.summary(Stat::Pts).is_some());
    }
}
