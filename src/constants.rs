/// League average effective field-goal percentage (WNBA, approximate)
pub const LEAGUE_AVG_EFG: f64 = 0.52;

/// Number of most recent games in the rolling window
pub const RECENT_GAMES: usize = 10;

/// Number of co-floor teammates considered for usage, assist and rebound context
pub const TOP_TEAMMATES: usize = 4;

/// Regulation game length in minutes
pub const GAME_MINUTES: f64 = 40.0;

/// Fraction of a player's minutes that falls in the modeled segment (10 of 40)
pub const SEGMENT_FRACTION: f64 = 10.0 / 40.0;

/// Scale from one segment back to a full-game estimate
pub const FULL_GAME_SCALE: f64 = 4.0;

/// Weight of free-throw attempts in possession and usage formulas
pub const FTA_POSSESSION_WEIGHT: f64 = 0.44;

/// Lower bound applied to a defender's eFG% before dividing by it
pub const DEFENDER_EFG_FLOOR: f64 = 0.3;

/// PTS standard deviation may not exceed this multiple of estimated FGA
pub const PTS_STD_PER_FGA: f64 = 1.5;

/// Possessions per game used when team aggregates are unavailable
pub const DEFAULT_POSSESSIONS: f64 = 80.0;

/// Weight of assists and rebounds in the impact score
pub const IMPACT_WEIGHT: f64 = 0.7;

/// Height assumed when a profile has no parseable height (6'0")
pub const DEFAULT_HEIGHT_IN: f64 = 72.0;

/// Bounds of the rebound factor
pub const REB_FACTOR_MIN: f64 = 0.85;
pub const REB_FACTOR_MAX: f64 = 1.20;

/// Usage multiplier bands: (minimum average teammate usage, multiplier).
///
/// Checked in order; the first band whose threshold is met wins.
pub const USAGE_BANDS: [(f64, f64); 5] = [
    (0.28, 0.88),
    (0.24, 0.93),
    (0.20, 0.98),
    (0.16, 1.02),
    (0.12, 1.07),
];

/// Multiplier when average teammate usage falls below every band
pub const USAGE_FLOOR_MULTIPLIER: f64 = 1.12;

/// Default number of Monte Carlo trials per player
pub const DEFAULT_TRIALS: usize = 20_000;

/// Default sampling seed
pub const DEFAULT_SEED: u64 = 42;

/// Get the usage multiplier for an average teammate usage rate
pub fn usage_multiplier(avg_teammate_usage: f64) -> f64 {
    for &(threshold, multiplier) in USAGE_BANDS.iter() {
        if avg_teammate_usage >= threshold {
            return multiplier;
        }
    }
    USAGE_FLOOR_MULTIPLIER
}
