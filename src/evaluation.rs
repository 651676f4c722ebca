//! Scoring simulated projections against what actually happened.
//!
//! Only the numbers are produced here; formatting a report is left to callers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game_log::Stat;
use crate::projection::{Projection, StatLine};
use crate::simulation::SimulationTrialSet;

/// Floor for the percentage-error denominator.
const MIN_ACTUAL: f64 = 0.1;
/// Floor for the z-score denominator.
const MIN_STD: f64 = 0.1;

/// Predicted distribution for one labelled player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub player: String,
    pub projection: Projection,
}

impl Prediction {
    pub fn new(player: impl Into<String>, projection: Projection) -> Self {
        Prediction {
            player: player.into(),
            projection,
        }
    }

    /// Empirical mean and std of a simulated trial set.
    pub fn from_trials(player: impl Into<String>, trials: &SimulationTrialSet) -> Option<Self> {
        let line = |stat| trials.summary(stat).map(|s| StatLine::new(s.mean, s.std));
        Some(Prediction::new(
            player,
            Projection {
                pts: line(Stat::Pts)?,
                reb: line(Stat::Reb)?,
                ast: line(Stat::Ast)?,
            },
        ))
    }
}

/// Observed box score for one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActualLine {
    #[serde(rename = "PLAYER")]
    pub player: String,
    #[serde(rename = "ACTUAL_PTS")]
    pub pts: f64,
    #[serde(rename = "ACTUAL_REB")]
    pub reb: f64,
    #[serde(rename = "ACTUAL_AST")]
    pub ast: f64,
}

impl ActualLine {
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Pts => self.pts,
            Stat::Reb => self.reb,
            Stat::Ast => self.ast,
        }
    }
}

/// Error of one prediction for one stat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatError {
    pub player: String,
    pub stat: Stat,
    pub predicted: f64,
    pub actual: f64,
    /// `actual - predicted`
    pub error: f64,
    pub abs_error: f64,
    pub pct_error: f64,
    pub z_score: f64,
    pub within_one_sigma: bool,
}

impl StatError {
    pub fn new(player: &str, stat: Stat, predicted: StatLine, actual: f64) -> Self {
        let error = actual - predicted.mean;
        let abs_error = error.abs();
        let z_score = if predicted.std > 0.0 {
            error / predicted.std.max(MIN_STD)
        } else {
            0.0
        };

        StatError {
            player: player.to_string(),
            stat,
            predicted: predicted.mean,
            actual,
            error,
            abs_error,
            pct_error: abs_error / actual.max(MIN_ACTUAL) * 100.0,
            z_score,
            within_one_sigma: z_score.abs() <= 1.0,
        }
    }
}

/// Aggregate accuracy for one stat across players.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatMetrics {
    pub stat: Stat,
    pub count: usize,
    pub mae: f64,
    pub mape: f64,
    pub rmse: f64,
    /// Percent of actuals within one predicted std
    pub ci_accuracy: f64,
    /// Absolute value of the mean z-score; near 0 means unbiased
    pub mean_abs_z: f64,
}

impl StatMetrics {
    fn from_errors(stat: Stat, errors: &[&StatError]) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        let n = errors.len() as f64;
        let avg = |f: &dyn Fn(&StatError) -> f64| errors.iter().map(|e| f(e)).sum::<f64>() / n;

        Some(StatMetrics {
            stat,
            count: errors.len(),
            mae: avg(&|e| e.abs_error),
            mape: avg(&|e| e.pct_error),
            rmse: avg(&|e| e.error * e.error).sqrt(),
            ci_accuracy: avg(&|e| if e.within_one_sigma { 100.0 } else { 0.0 }),
            mean_abs_z: avg(&|e| e.z_score).abs(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade from MAPE and CI accuracy, both averaged over stats, in percent.
    pub fn from_scores(avg_mape: f64, avg_ci_accuracy: f64) -> Self {
        const BANDS: [(Grade, f64, f64); 4] = [
            (Grade::A, 15.0, 70.0),
            (Grade::B, 25.0, 60.0),
            (Grade::C, 35.0, 50.0),
            (Grade::D, 50.0, 40.0),
        ];
        BANDS
            .iter()
            .find(|(_, mape, ci)| avg_mape <= *mape && avg_ci_accuracy >= *ci)
            .map(|(grade, _, _)| *grade)
            .unwrap_or(Grade::F)
    }

    pub fn description(self) -> &'static str {
        match self {
            Grade::A => "Excellent",
            Grade::B => "Good",
            Grade::C => "Fair",
            Grade::D => "Poor",
            Grade::F => "Very Poor",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.description())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub errors: Vec<StatError>,
    pub metrics: Vec<StatMetrics>,
    pub avg_mape: f64,
    pub avg_ci_accuracy: f64,
    pub grade: Grade,
}

impl Evaluation {
    pub fn metrics_for(&self, stat: Stat) -> Option<&StatMetrics> {
        self.metrics.iter().find(|m| m.stat == stat)
    }

    pub fn players(&self) -> usize {
        let mut names: Vec<&str> = self.errors.iter().map(|e| e.player.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

/// Join predictions to actuals by player label and score them.
///
/// Players present on only one side are ignored. `None` when nobody matches.
pub fn evaluate(predictions: &[Prediction], actuals: &[ActualLine]) -> Option<Evaluation> {
    let errors: Vec<StatError> = predictions
        .iter()
        .filter_map(|p| actuals.iter().find(|a| a.player == p.player).map(|a| (p, a)))
        .flat_map(|(p, a)| {
            Stat::ALL.into_iter().map(move |stat| {
                StatError::new(&p.player, stat, p.projection.get(stat), a.get(stat))
            })
        })
        .collect();

    if errors.is_empty() {
        return None;
    }

    let metrics: Vec<StatMetrics> = Stat::ALL
        .into_iter()
        .filter_map(|stat| {
            let subset: Vec<&StatError> = errors.iter().filter(|e| e.stat == stat).collect();
            StatMetrics::from_errors(stat, &subset)
        })
        .collect();

    let n = metrics.len() as f64;
    let avg_mape = metrics.iter().map(|m| m.mape).sum::<f64>() / n;
    let avg_ci_accuracy = metrics.iter().map(|m| m.ci_accuracy).sum::<f64>() / n;

    Some(Evaluation {
        errors,
        metrics,
        avg_mape,
        avg_ci_accuracy,
        grade: Grade::from_scores(avg_mape, avg_ci_accuracy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(player: &str, pts: (f64, f64), reb: (f64, f64), ast: (f64, f64)) -> Prediction {
        Prediction::new(
            player,
            Projection {
                pts: StatLine::new(pts.0, pts.1),
                reb: StatLine::new(reb.0, reb.1),
                ast: StatLine::new(ast.0, ast.1),
            },
        )
    }

    fn actual(player: &str, pts: f64, reb: f64, ast: f64) -> ActualLine {
        ActualLine {
            player: player.to_string(),
            pts,
            reb,
            ast,
        }
    }

    #[test]
    fn test_stat_error_fields() {
        let e = StatError::new("A", Stat::Pts, StatLine::new(15.0, 4.0), 21.0);
        assert_eq!(e.error, 6.0);
        assert_eq!(e.abs_error, 6.0);
        assert!((e.pct_error - 6.0 / 21.0 * 100.0).abs() < 1e-9);
        assert_eq!(e.z_score, 1.5);
        assert!(!e.within_one_sigma);
    }

    #[test]
    fn test_zero_actual_and_zero_std() {
        let e = StatError::new("A", Stat::Ast, StatLine::new(0.5, 0.0), 0.0);
        // abs 0.5 over the 0.1 floor
        assert!((e.pct_error - 500.0).abs() < 1e-9);
        assert_eq!(e.z_score, 0.0);
        assert!(e.within_one_sigma);

        let tiny = StatError::new("A", Stat::Ast, StatLine::new(1.0, 0.01), 1.2);
        assert!((tiny.z_score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_per_stat() {
        let preds = vec![
            prediction("A", (20.0, 5.0), (5.0, 2.0), (4.0, 1.0)),
            prediction("B", (10.0, 2.0), (8.0, 2.0), (2.0, 1.0)),
        ];
        let actuals = vec![actual("A", 24.0, 5.0, 4.0), actual("B", 7.0, 8.0, 2.0)];

        let eval = evaluate(&preds, &actuals).unwrap();
        let pts = eval.metrics_for(Stat::Pts).unwrap();
        assert_eq!(pts.count, 2);
        assert!((pts.mae - 3.5).abs() < 1e-9);
        assert!((pts.rmse - 12.5f64.sqrt()).abs() < 1e-9);
        // A: z 0.8 inside, B: z -1.5 outside
        assert_eq!(pts.ci_accuracy, 50.0);
        assert!((pts.mean_abs_z - 0.35).abs() < 1e-9);

        let reb = eval.metrics_for(Stat::Reb).unwrap();
        assert_eq!(reb.mae, 0.0);
        assert_eq!(reb.ci_accuracy, 100.0);
        assert_eq!(eval.players(), 2);
    }

    #[test]
    fn test_unmatched_players_ignored() {
        let preds = vec![prediction("A", (20.0, 5.0), (5.0, 2.0), (4.0, 1.0))];
        assert!(evaluate(&preds, &[actual("Z", 1.0, 1.0, 1.0)]).is_none());

        let eval = evaluate(
            &preds,
            &[actual("A", 20.0, 5.0, 4.0), actual("Z", 1.0, 1.0, 1.0)],
        )
        .unwrap();
        assert_eq!(eval.errors.len(), 3);
        assert_eq!(eval.grade, Grade::A);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_scores(15.0, 70.0), Grade::A);
        assert_eq!(Grade::from_scores(10.0, 65.0), Grade::B);
        assert_eq!(Grade::from_scores(30.0, 90.0), Grade::C);
        assert_eq!(Grade::from_scores(50.0, 40.0), Grade::D);
        assert_eq!(Grade::from_scores(50.1, 90.0), Grade::F);
        assert_eq!(Grade::from_scores(5.0, 39.0), Grade::F);
        assert_eq!(Grade::B.to_string(), "B (Good)");
    }

    #[test]
    fn test_actual_line_columns() {
        let json = r#"{"PLAYER":"A","ACTUAL_PTS":12.0,"ACTUAL_REB":3.0,"ACTUAL_AST":1.0}"#;
        let line: ActualLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.get(Stat::Reb), 3.0);
    }

    #[test]
    fn test_prediction_from_trials() {
        use crate::simulation::MonteCarloSimulator;

        let proj = Projection {
            pts: StatLine::new(12.0, 0.0),
            reb: StatLine::new(4.0, 0.0),
            ast: StatLine::new(2.0, 0.0),
        };
        let trials = MonteCarloSimulator::new(50, 1).simulate(1, &proj);
        let pred = Prediction::from_trials("A", &trials).unwrap();
        assert_eq!(pred.projection.pts.mean, 12.0);
        assert_eq!(pred.projection.pts.std, 0.0);
    }
}
