use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_HEIGHT_IN;
use crate::game_log::PlayerId;

pub type TeamId = u64;

/// Position group a raw roster position normalizes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Guard,
    Forward,
    Center,
}

impl Position {
    /// Normalize a raw roster position ("G", "F-C", "Guard-Forward", ...).
    ///
    /// Contains "G" -> Guard, else contains "C" -> Center, else Forward.
    /// Missing positions count as Forward.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some(p) if p.contains('G') => Position::Guard,
            Some(p) if p.contains('C') => Position::Center,
            _ => Position::Forward,
        }
    }
}

/// Parse a "feet-inches" height string into inches.
///
/// Returns 72 (6'0") when the string is missing or malformed.
pub fn parse_height(height: Option<&str>) -> f64 {
    height
        .and_then(|h| {
            let (feet, inches) = h.trim().split_once('-')?;
            let feet: u32 = feet.trim().parse().ok()?;
            let inches: u32 = inches.trim().parse().ok()?;
            let total = feet.checked_mul(12)?.checked_add(inches)?;
            Some(total as f64)
        })
        .unwrap_or(DEFAULT_HEIGHT_IN)
}

/// Static player metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    /// Height in inches
    pub height: f64,
    /// Position as reported by the data source, e.g. "G-F"
    pub raw_position: Option<String>,
    pub position: Position,
    pub team: TeamId,
}

impl PlayerProfile {
    /// Build a profile from data-source strings.
    pub fn from_source(
        id: PlayerId,
        name: impl Into<String>,
        height: Option<&str>,
        position: Option<&str>,
        team: TeamId,
    ) -> Self {
        let raw_position = position.map(str::trim).filter(|p| !p.is_empty()).map(String::from);
        PlayerProfile {
            id,
            name: name.into(),
            height: parse_height(height),
            position: Position::normalize(raw_position.as_deref()),
            raw_position,
            team,
        }
    }

    /// Stand-in profile used when the real lookup fails: 6'0" guard.
    pub fn unknown(id: PlayerId, team: TeamId) -> Self {
        PlayerProfile {
            id,
            name: String::new(),
            height: DEFAULT_HEIGHT_IN,
            raw_position: Some("G".to_string()),
            position: Position::Guard,
            team,
        }
    }

    /// Position string used for exact matchup comparisons; "F" when unknown.
    pub fn position_label(&self) -> &str {
        self.raw_position.as_deref().unwrap_or("F")
    }

    fn position_has(&self, c: char) -> bool {
        self.raw_position.as_deref().is_some_and(|p| p.contains(c))
    }

    pub fn plays_guard(&self) -> bool {
        self.position_has('G')
    }

    pub fn plays_forward(&self) -> bool {
        self.position_has('F')
    }

    /// Lists forward or center anywhere in the raw position.
    pub fn is_big(&self) -> bool {
        self.position_has('F') || self.position_has('C')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_height() {
        assert_eq!(parse_height(Some("6-2")), 74.0);
        assert_eq!(parse_height(Some("5-11")), 71.0);
        assert_eq!(parse_height(Some(" 6 - 4 ")), 76.0);
    }

    #[test]
    fn test_parse_height_defaults() {
        assert_eq!(parse_height(None), 72.0);
        assert_eq!(parse_height(Some("")), 72.0);
        assert_eq!(parse_height(Some("74")), 72.0);
        assert_eq!(parse_height(Some("six-two")), 72.0);
    }

    #[test]
    fn test_parse_height_overflow_defaults() {
        assert_eq!(parse_height(Some("400000000-0")), 72.0);
        assert_eq!(parse_height(Some("6-4294967295")), 72.0);
    }

    #[test]
    fn test_normalize_position() {
        assert_eq!(Position::normalize(Some("G")), Position::Guard);
        assert_eq!(Position::normalize(Some("G-F")), Position::Guard);
        assert_eq!(Position::normalize(Some("F-C")), Position::Center);
        assert_eq!(Position::normalize(Some("C")), Position::Center);
        assert_eq!(Position::normalize(Some("F")), Position::Forward);
        assert_eq!(Position::normalize(None), Position::Forward);
    }

    #[test]
    fn test_profile_from_source() {
        let p = PlayerProfile::from_source(1, "Napheesa Collier", Some("6-1"), Some("F"), 10);
        assert_eq!(p.height, 73.0);
        assert_eq!(p.position, Position::Forward);
        assert!(p.is_big());
        assert!(!p.plays_guard());
    }

    #[test]
    fn test_blank_position_is_missing() {
        let p = PlayerProfile::from_source(1, "X", None, Some("  "), 10);
        assert_eq!(p.raw_position, None);
        assert_eq!(p.position_label(), "F");
        assert!(!p.is_big());
    }

    #[test]
    fn test_unknown_profile() {
        let p = PlayerProfile::unknown(5, 10);
        assert_eq!(p.height, 72.0);
        assert!(p.plays_guard());
    }
}
