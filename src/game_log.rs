use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::constants::{FTA_POSSESSION_WEIGHT, IMPACT_WEIGHT};

pub type PlayerId = u64;

/// Box-score categories that get projected and simulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stat {
    Pts,
    Reb,
    Ast,
}

impl Stat {
    pub const ALL: [Stat; 3] = [Stat::Pts, Stat::Reb, Stat::Ast];

    pub fn label(self) -> &'static str {
        match self {
            Stat::Pts => "PTS",
            Stat::Reb => "REB",
            Stat::Ast => "AST",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid minutes value: {0:?}")]
pub struct ParseMinutesError(String);

/// Minutes played, as a decimal number of minutes.
///
/// Data sources report either a number or a "MM:SS" string; both parse here.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "RawMinutes", into = "f64")]
pub struct Minutes(f64);

impl Minutes {
    pub fn new(minutes: f64) -> Self {
        Minutes(minutes.max(0.0))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl FromStr for Minutes {
    type Err = ParseMinutesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseMinutesError(s.to_string());

        let value = match s.split_once(':') {
            Some((mm, ss)) => {
                let mm: f64 = mm.trim().parse().map_err(|_| err())?;
                let ss: f64 = ss.trim().parse().map_err(|_| err())?;
                if !(0.0..60.0).contains(&ss) {
                    return Err(err());
                }
                mm + ss / 60.0
            }
            None => s.parse().map_err(|_| err())?,
        };

        if !value.is_finite() || value < 0.0 {
            return Err(err());
        }
        Ok(Minutes(value))
    }
}

impl From<Minutes> for f64 {
    fn from(m: Minutes) -> f64 {
        m.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Number(f64),
    Text(String),
}

impl TryFrom<RawMinutes> for Minutes {
    type Error = ParseMinutesError;

    fn try_from(raw: RawMinutes) -> Result<Self, Self::Error> {
        match raw {
            RawMinutes::Number(n) if n.is_finite() && n >= 0.0 => Ok(Minutes(n)),
            RawMinutes::Number(n) => Err(ParseMinutesError(n.to_string())),
            RawMinutes::Text(s) => s.parse(),
        }
    }
}

/// One player's stat line for one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GameLogRow {
    pub game_date: NaiveDate,
    #[serde(rename = "MIN")]
    pub minutes: Minutes,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub ftm: f64,
    pub fta: f64,
    pub tov: f64,
}

impl GameLogRow {
    /// A row with only date and minutes set; everything else zero.
    pub fn new(game_date: NaiveDate, minutes: f64) -> Self {
        GameLogRow {
            game_date,
            minutes: Minutes::new(minutes),
            pts: 0.0,
            reb: 0.0,
            ast: 0.0,
            fgm: 0.0,
            fga: 0.0,
            fg3m: 0.0,
            ftm: 0.0,
            fta: 0.0,
            tov: 0.0,
        }
    }

    pub fn with_box(mut self, pts: f64, reb: f64, ast: f64) -> Self {
        self.pts = pts;
        self.reb = reb;
        self.ast = ast;
        self
    }

    pub fn with_shooting(mut self, fgm: f64, fga: f64, fg3m: f64, ftm: f64, fta: f64) -> Self {
        self.fgm = fgm;
        self.fga = fga;
        self.fg3m = fg3m;
        self.ftm = ftm;
        self.fta = fta;
        self
    }

    pub fn with_turnovers(mut self, tov: f64) -> Self {
        self.tov = tov;
        self
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Pts => self.pts,
            Stat::Reb => self.reb,
            Stat::Ast => self.ast,
        }
    }
}

/// Rolling summary over a player's most recent games.
///
/// Holds window totals plus the sample standard deviation of each projected
/// stat. Means are derived from the totals.
#[derive(Clone, Debug, PartialEq)]
pub struct RecentForm {
    pub games: usize,
    pub minutes: f64,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub ftm: f64,
    pub fta: f64,
    pub tov: f64,
    pts_std: Option<f64>,
    reb_std: Option<f64>,
    ast_std: Option<f64>,
}

impl RecentForm {
    /// Summarize the `window` most recent rows of a game log.
    ///
    /// Rows may arrive in any order; they are ranked by date, most recent first.
    /// Returns `None` for an empty log.
    pub fn from_log(rows: &[GameLogRow], window: usize) -> Option<Self> {
        let mut recent: Vec<&GameLogRow> = rows.iter().collect();
        recent.sort_by(|a, b| b.game_date.cmp(&a.game_date));
        recent.truncate(window);

        if recent.is_empty() {
            return None;
        }

        let total = |f: fn(&GameLogRow) -> f64| recent.iter().map(|r| f(r)).sum::<f64>();
        let spread = |stat: Stat| {
            let sd = recent.iter().map(|r| r.stat(stat)).std_dev();
            sd.is_finite().then_some(sd)
        };

        Some(RecentForm {
            games: recent.len(),
            minutes: total(|r| r.minutes.as_f64()),
            pts: total(|r| r.pts),
            reb: total(|r| r.reb),
            ast: total(|r| r.ast),
            fgm: total(|r| r.fgm),
            fga: total(|r| r.fga),
            fg3m: total(|r| r.fg3m),
            ftm: total(|r| r.ftm),
            fta: total(|r| r.fta),
            tov: total(|r| r.tov),
            pts_std: spread(Stat::Pts),
            reb_std: spread(Stat::Reb),
            ast_std: spread(Stat::Ast),
        })
    }

    fn per_game(&self, total: f64) -> f64 {
        total / self.games as f64
    }

    pub fn mean_minutes(&self) -> f64 {
        self.per_game(self.minutes)
    }

    pub fn mean(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Pts => self.per_game(self.pts),
            Stat::Reb => self.per_game(self.reb),
            Stat::Ast => self.per_game(self.ast),
        }
    }

    /// Sample (n - 1) standard deviation; `None` with fewer than two games.
    pub fn std_dev(&self, stat: Stat) -> Option<f64> {
        match stat {
            Stat::Pts => self.pts_std,
            Stat::Reb => self.reb_std,
            Stat::Ast => self.ast_std,
        }
    }

    /// Possessions used per game: FGA + 0.44 * FTA + TOV.
    pub fn possessions_used(&self) -> f64 {
        self.per_game(self.fga + FTA_POSSESSION_WEIGHT * self.fta + self.tov)
    }

    /// Effective field-goal percentage, `None` without any attempts.
    pub fn effective_fg(&self) -> Option<f64> {
        (self.fga > 0.0).then(|| (self.fgm + 0.5 * self.fg3m) / self.fga)
    }

    /// Free-throw percentage, `None` without any attempts.
    pub fn ft_pct(&self) -> Option<f64> {
        (self.fta > 0.0).then(|| self.ftm / self.fta)
    }

    /// Free-throw attempts per minute played, 0 when no minutes were logged.
    pub fn fta_per_minute(&self) -> f64 {
        if self.minutes > 0.0 {
            self.fta / self.minutes
        } else {
            0.0
        }
    }

    /// Ordering heuristic: PTS + 0.7 * AST + 0.7 * REB per game.
    pub fn impact_score(&self) -> f64 {
        self.mean(Stat::Pts)
            + IMPACT_WEIGHT * self.mean(Stat::Ast)
            + IMPACT_WEIGHT * self.mean(Stat::Reb)
    }
}
