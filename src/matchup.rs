use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::game_log::PlayerId;
use crate::player::{PlayerProfile, Position};

/// A player as seen by the matchup heuristic.
#[derive(Clone, Debug, PartialEq)]
pub struct RosterEntry {
    pub id: PlayerId,
    /// Raw roster position, "F" when unknown
    pub position: String,
    pub group: Position,
    /// PTS + 0.7 * AST + 0.7 * REB over the recent window
    pub impact: f64,
}

impl RosterEntry {
    pub fn new(profile: &PlayerProfile, impact: f64) -> Self {
        RosterEntry {
            id: profile.id,
            position: profile.position_label().to_string(),
            group: profile.position,
            impact,
        }
    }
}

/// Home player to primary defender pairing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupAssignment {
    pairs: Vec<(PlayerId, Option<PlayerId>)>,
}

impl MatchupAssignment {
    /// Defender assigned to a home player; `None` if the player was not
    /// assigned or the opposing roster ran out.
    pub fn defender_for(&self, player: PlayerId) -> Option<PlayerId> {
        self.pairs
            .iter()
            .find(|(home, _)| *home == player)
            .and_then(|(_, defender)| *defender)
    }

    /// Pairs in assignment order (descending home impact).
    pub fn pairs(&self) -> &[(PlayerId, Option<PlayerId>)] {
        &self.pairs
    }

    /// Home players left without a defender.
    pub fn unmatched(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.pairs
            .iter()
            .filter(|(_, d)| d.is_none())
            .map(|(home, _)| *home)
    }
}

fn by_impact(a: &RosterEntry, b: &RosterEntry) -> Ordering {
    b.impact.partial_cmp(&a.impact).unwrap_or(Ordering::Equal)
}

/// Greedy position-first defender assignment.
///
/// Home players are taken in descending impact order and each claims, from the
/// unused opponents in descending impact order, the first with (1) the same
/// position string, else (2) the same position group, else (3) anyone. The
/// result depends on processing order and is not a globally optimal matching.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchupAssigner;

impl MatchupAssigner {
    pub fn new() -> Self {
        MatchupAssigner
    }

    pub fn assign(&self, home: &[RosterEntry], opponents: &[RosterEntry]) -> MatchupAssignment {
        let mut home: Vec<&RosterEntry> = home.iter().collect();
        let mut opponents: Vec<&RosterEntry> = opponents.iter().collect();
        home.sort_by(|a, b| by_impact(a, b));
        opponents.sort_by(|a, b| by_impact(a, b));

        let mut used: HashSet<PlayerId> = HashSet::new();
        let mut pairs = Vec::with_capacity(home.len());

        for player in home {
            let open: Vec<&RosterEntry> = opponents
                .iter()
                .copied()
                .filter(|o| !used.contains(&o.id))
                .collect();
            let defender = open
                .iter()
                .find(|o| o.position == player.position)
                .or_else(|| open.iter().find(|o| o.group == player.group))
                .or_else(|| open.first())
                .map(|o| o.id);

            if let Some(id) = defender {
                used.insert(id);
            }
            pairs.push((player.id, defender));
        }

        MatchupAssignment { pairs }
    }
}
