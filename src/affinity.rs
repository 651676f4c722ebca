use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::game_log::{GameLogRow, PlayerId};
use crate::repository::GameLogRepository;

/// Symmetric shared-minutes weighting between players.
///
/// For every game date on which two players both logged minutes, the pair
/// accumulates `min(minutes_a, minutes_b)`.
#[derive(Clone, Debug, Default)]
pub struct SharedMinutesMatrix {
    /// Players in the order their logs were supplied; breaks ranking ties
    order: Vec<PlayerId>,
    shared: HashMap<PlayerId, HashMap<PlayerId, f64>>,
}

impl SharedMinutesMatrix {
    /// Build the matrix from `(player, game log)` pairs.
    pub fn build<'a, I>(logs: I) -> Self
    where
        I: IntoIterator<Item = (PlayerId, &'a [GameLogRow])>,
    {
        let mut matrix = SharedMinutesMatrix::default();
        let mut games: BTreeMap<NaiveDate, Vec<(PlayerId, f64)>> = BTreeMap::new();

        for (player, rows) in logs {
            if !matrix.order.contains(&player) {
                matrix.order.push(player);
            }
            for row in rows {
                let game = games.entry(row.game_date).or_default();
                // First row wins if a log repeats a date
                if game.iter().all(|(p, _)| *p != player) {
                    game.push((player, row.minutes.as_f64()));
                }
            }
        }

        for lineup in games.values() {
            for (i, &(a, min_a)) in lineup.iter().enumerate() {
                for &(b, min_b) in &lineup[i + 1..] {
                    let shared = min_a.min(min_b);
                    *matrix.shared.entry(a).or_default().entry(b).or_insert(0.0) += shared;
                    *matrix.shared.entry(b).or_default().entry(a).or_insert(0.0) += shared;
                }
            }
        }

        matrix
    }

    /// Cumulative shared minutes for a pair (0 if they never overlapped).
    pub fn shared(&self, a: PlayerId, b: PlayerId) -> f64 {
        self.shared
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    /// A player's `n` teammates with the most shared minutes.
    ///
    /// Only teammates who shared at least one game date are ranked. Ties keep
    /// the order in which the players' logs were supplied.
    pub fn top_teammates(&self, player: PlayerId, n: usize) -> Vec<PlayerId> {
        let Some(row) = self.shared.get(&player) else {
            return Vec::new();
        };

        let mut ranked: Vec<(PlayerId, f64)> = self
            .order
            .iter()
            .filter_map(|id| row.get(id).map(|&mins| (*id, mins)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.into_iter().take(n).map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Finds the teammates a player most often shares the floor with.
pub struct TeammateAffinityEngine<'a, R: ?Sized> {
    repo: &'a R,
    top_n: usize,
}

impl<'a, R: GameLogRepository + ?Sized> TeammateAffinityEngine<'a, R> {
    pub fn new(repo: &'a R, top_n: usize) -> Self {
        TeammateAffinityEngine { repo, top_n }
    }

    /// Fetch each player's log and build the shared-minutes matrix.
    ///
    /// Players whose logs are missing simply do not appear.
    pub fn shared_minutes(&self, players: &[PlayerId]) -> SharedMinutesMatrix {
        let logs: Vec<(PlayerId, Vec<GameLogRow>)> = players
            .iter()
            .filter_map(|&id| match self.repo.game_log(id) {
                Ok(rows) => Some((id, rows)),
                Err(e) => {
                    debug!(player = id, error = %e, "skipping player in shared minutes");
                    None
                }
            })
            .collect();

        SharedMinutesMatrix::build(logs.iter().map(|(id, rows)| (*id, rows.as_slice())))
    }

    /// Top co-floor teammates of `player` on its current roster.
    ///
    /// Empty when the profile or roster is unavailable or the player never
    /// overlapped with anyone; callers treat that as neutral context.
    pub fn on_court_teammates(&self, player: PlayerId) -> Vec<PlayerId> {
        let roster = self
            .repo
            .profile(player)
            .and_then(|profile| self.repo.roster(profile.team));

        let mut players = match roster {
            Ok(roster) => roster,
            Err(e) => {
                debug!(player, error = %e, "no roster context for teammates");
                return Vec::new();
            }
        };
        players.retain(|&id| id != player);
        if players.is_empty() {
            return Vec::new();
        }
        players.push(player);

        self.shared_minutes(&players).top_teammates(player, self.top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerProfile;
    use crate::repository::InMemoryRepository;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn log(entries: &[(u32, f64)]) -> Vec<GameLogRow> {
        entries.iter().map(|&(d, m)| GameLogRow::new(day(d), m)).collect()
    }

    #[test]
    fn test_shared_minutes_min_per_game() {
        let a = log(&[(1, 30.0), (2, 25.0)]);
        let b = log(&[(1, 20.0), (2, 35.0), (3, 40.0)]);
        let matrix = SharedMinutesMatrix::build(vec![(1, a.as_slice()), (2, b.as_slice())]);

        assert!((matrix.shared(1, 2) - 45.0).abs() < 1e-12);
        assert_eq!(matrix.shared(1, 2), matrix.shared(2, 1));
    }

    #[test]
    fn test_clock_minutes_are_fractional() {
        let a: Vec<GameLogRow> = vec![GameLogRow {
            minutes: "30:30".parse().unwrap(),
            ..GameLogRow::new(day(1), 0.0)
        }];
        let b = log(&[(1, 32.0)]);
        let matrix = SharedMinutesMatrix::build(vec![(1, a.as_slice()), (2, b.as_slice())]);
        assert!((matrix.shared(1, 2) - 30.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlap_gives_no_teammates() {
        let a = log(&[(1, 30.0)]);
        let b = log(&[(2, 30.0)]);
        let matrix = SharedMinutesMatrix::build(vec![(1, a.as_slice()), (2, b.as_slice())]);

        assert_eq!(matrix.shared(1, 2), 0.0);
        assert!(matrix.top_teammates(1, 4).is_empty());
    }

    #[test]
    fn test_top_teammates_ranking_and_ties() {
        let target = log(&[(1, 36.0), (2, 36.0)]);
        let low = log(&[(1, 10.0)]);
        let tie_first = log(&[(1, 20.0)]);
        let tie_second = log(&[(2, 20.0)]);
        let high = log(&[(1, 30.0), (2, 30.0)]);

        let matrix = SharedMinutesMatrix::build(vec![
            (10, low.as_slice()),
            (11, tie_first.as_slice()),
            (12, tie_second.as_slice()),
            (13, high.as_slice()),
            (99, target.as_slice()),
        ]);

        assert_eq!(matrix.top_teammates(99, 3), vec![13, 11, 12]);
        assert_eq!(matrix.top_teammates(99, 10), vec![13, 11, 12, 10]);
    }

    #[test]
    fn test_engine_uses_roster_of_player_team() {
        let mut repo = InMemoryRepository::new();
        for id in 1..=6 {
            repo.add_player(PlayerProfile::from_source(id, format!("P{}", id), None, None, 100));
        }
        // Player 1 plays with everyone, 2 has the most shared time, 6 never logged a game
        repo.set_game_log(1, log(&[(1, 34.0), (2, 34.0), (3, 34.0)]));
        repo.set_game_log(2, log(&[(1, 30.0), (2, 30.0), (3, 30.0)]));
        repo.set_game_log(3, log(&[(1, 25.0), (2, 25.0)]));
        repo.set_game_log(4, log(&[(1, 12.0)]));
        repo.set_game_log(5, log(&[(3, 18.0)]));

        let engine = TeammateAffinityEngine::new(&repo, 4);
        assert_eq!(engine.on_court_teammates(1), vec![2, 3, 5, 4]);
    }

    #[test]
    fn test_engine_missing_profile_is_empty() {
        let repo = InMemoryRepository::new();
        let engine = TeammateAffinityEngine::new(&repo, 4);
        assert!(engine.on_court_teammates(42).is_empty());
    }

    #[test]
    fn test_engine_empty_log_is_empty() {
        let mut repo = InMemoryRepository::new();
        repo.add_player(PlayerProfile::from_source(1, "A", None, None, 100));
        repo.add_player(PlayerProfile::from_source(2, "B", None, None, 100));
        repo.set_game_log(2, log(&[(1, 30.0)]));

        let engine = TeammateAffinityEngine::new(&repo, 4);
        assert!(engine.on_court_teammates(1).is_empty());
    }
}
