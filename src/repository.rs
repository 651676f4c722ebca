//! Boundary to the box-score data source.
//!
//! Fetching is owned by the caller (the Python data layer in practice); the
//! core only sees the [`GameLogRepository`] trait. Every lookup returns
//! `Result<_, MissingData>` so the factor code can choose its own fallback.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::MissingData;
use crate::game_log::{GameLogRow, PlayerId};
use crate::player::{PlayerProfile, TeamId};

pub type Lookup<T> = std::result::Result<T, MissingData>;

/// Per-game team aggregates against one opponent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub fga: f64,
    pub fta: f64,
    pub oreb: f64,
    pub tov: f64,
}

impl TeamSeasonStats {
    pub fn new(fga: f64, fta: f64, oreb: f64, tov: f64) -> Self {
        TeamSeasonStats { fga, fta, oreb, tov }
    }
}

pub trait GameLogRepository {
    /// Season game log, in any order.
    fn game_log(&self, player: PlayerId) -> Lookup<Vec<GameLogRow>>;

    fn profile(&self, player: PlayerId) -> Lookup<PlayerProfile>;

    /// Players on a team's current roster, in the source's order.
    fn roster(&self, team: TeamId) -> Lookup<Vec<PlayerId>>;

    /// `team`'s per-game aggregates in games against `opponent`.
    fn team_stats(&self, team: TeamId, opponent: TeamId) -> Lookup<TeamSeasonStats>;
}

impl<R: GameLogRepository + ?Sized> GameLogRepository for &R {
    fn game_log(&self, player: PlayerId) -> Lookup<Vec<GameLogRow>> {
        (**self).game_log(player)
    }

    fn profile(&self, player: PlayerId) -> Lookup<PlayerProfile> {
        (**self).profile(player)
    }

    fn roster(&self, team: TeamId) -> Lookup<Vec<PlayerId>> {
        (**self).roster(team)
    }

    fn team_stats(&self, team: TeamId, opponent: TeamId) -> Lookup<TeamSeasonStats> {
        (**self).team_stats(team, opponent)
    }
}

/// Repository backed by plain maps, filled by the caller ahead of a run.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    logs: HashMap<PlayerId, Vec<GameLogRow>>,
    profiles: HashMap<PlayerId, PlayerProfile>,
    rosters: HashMap<TeamId, Vec<PlayerId>>,
    team_stats: HashMap<(TeamId, TeamId), TeamSeasonStats>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game(&mut self, player: PlayerId, row: GameLogRow) {
        self.logs.entry(player).or_default().push(row);
    }

    pub fn set_game_log(&mut self, player: PlayerId, rows: Vec<GameLogRow>) {
        self.logs.insert(player, rows);
    }

    /// Store a profile and append the player to its team's roster.
    pub fn add_player(&mut self, profile: PlayerProfile) {
        let roster = self.rosters.entry(profile.team).or_default();
        if !roster.contains(&profile.id) {
            roster.push(profile.id);
        }
        self.profiles.insert(profile.id, profile);
    }

    pub fn set_roster(&mut self, team: TeamId, players: Vec<PlayerId>) {
        self.rosters.insert(team, players);
    }

    pub fn set_team_stats(&mut self, team: TeamId, opponent: TeamId, stats: TeamSeasonStats) {
        self.team_stats.insert((team, opponent), stats);
    }

    pub fn player_count(&self) -> usize {
        self.profiles.len()
    }
}

impl GameLogRepository for InMemoryRepository {
    fn game_log(&self, player: PlayerId) -> Lookup<Vec<GameLogRow>> {
        match self.logs.get(&player) {
            Some(rows) if !rows.is_empty() => Ok(rows.clone()),
            _ => Err(MissingData::GameLog(player)),
        }
    }

    fn profile(&self, player: PlayerId) -> Lookup<PlayerProfile> {
        self.profiles.get(&player).cloned().ok_or(MissingData::Profile(player))
    }

    fn roster(&self, team: TeamId) -> Lookup<Vec<PlayerId>> {
        match self.rosters.get(&team) {
            Some(players) if !players.is_empty() => Ok(players.clone()),
            _ => Err(MissingData::Roster(team)),
        }
    }

    fn team_stats(&self, team: TeamId, opponent: TeamId) -> Lookup<TeamSeasonStats> {
        self.team_stats
            .get(&(team, opponent))
            .copied()
            .ok_or(MissingData::TeamStats { team, opponent })
    }
}

/// Rate-limited handle around a repository.
///
/// Consecutive lookups are spaced at least `delay` apart. Retry and backoff
/// belong to the wrapped client.
#[derive(Debug)]
pub struct RateLimited<R> {
    inner: R,
    delay: Duration,
    last_call: Cell<Option<Instant>>,
    calls: Cell<usize>,
}

impl<R: GameLogRepository> RateLimited<R> {
    pub fn new(inner: R, delay: Duration) -> Self {
        RateLimited {
            inner,
            delay,
            last_call: Cell::new(None),
            calls: Cell::new(0),
        }
    }

    /// Number of lookups issued through this handle.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn throttle(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last_call.set(Some(Instant::now()));
        self.calls.set(self.calls.get() + 1);
    }
}

impl<R: GameLogRepository> GameLogRepository for RateLimited<R> {
    fn game_log(&self, player: PlayerId) -> Lookup<Vec<GameLogRow>> {
        self.throttle();
        self.inner.game_log(player)
    }

    fn profile(&self, player: PlayerId) -> Lookup<PlayerProfile> {
        self.throttle();
        self.inner.profile(player)
    }

    fn roster(&self, team: TeamId) -> Lookup<Vec<PlayerId>> {
        self.throttle();
        self.inner.roster(team)
    }

    fn team_stats(&self, team: TeamId, opponent: TeamId) -> Lookup<TeamSeasonStats> {
        self.throttle();
        self.inner.team_stats(team, opponent)
    }
}

/// Per-run memo of player lookups, failures included.
///
/// One projection asks for the same logs and profiles many times; this keeps
/// each player to a single fetch. Roster and team-stat lookups pass through.
#[derive(Debug)]
pub struct Memoized<R> {
    inner: R,
    logs: RefCell<HashMap<PlayerId, Lookup<Vec<GameLogRow>>>>,
    profiles: RefCell<HashMap<PlayerId, Lookup<PlayerProfile>>>,
}

impl<R: GameLogRepository> Memoized<R> {
    pub fn new(inner: R) -> Self {
        Memoized {
            inner,
            logs: RefCell::new(HashMap::new()),
            profiles: RefCell::new(HashMap::new()),
        }
    }
}

impl<R: GameLogRepository> GameLogRepository for Memoized<R> {
    fn game_log(&self, player: PlayerId) -> Lookup<Vec<GameLogRow>> {
        if let Some(hit) = self.logs.borrow().get(&player) {
            return hit.clone();
        }
        let fetched = self.inner.game_log(player);
        self.logs.borrow_mut().insert(player, fetched.clone());
        fetched
    }

    fn profile(&self, player: PlayerId) -> Lookup<PlayerProfile> {
        if let Some(hit) = self.profiles.borrow().get(&player) {
            return hit.clone();
        }
        let fetched = self.inner.profile(player);
        self.profiles.borrow_mut().insert(player, fetched.clone());
        fetched
    }

    fn roster(&self, team: TeamId) -> Lookup<Vec<PlayerId>> {
        self.inner.roster(team)
    }

    fn team_stats(&self, team: TeamId, opponent: TeamId) -> Lookup<TeamSeasonStats> {
        self.inner.team_stats(team, opponent)
    }
}
