//! Risk scoring for background-check reports.
//!
//! A weighted-penalty heuristic, not a statistical model: the score starts at
//! 100 and loses 10 points per criminal record and 20 points when the credit
//! score is below 600, clamped to [0, 100].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::api::CheckResults;

const CRIMINAL_RECORD_PENALTY: i32 = 10;
const LOW_CREDIT_PENALTY: i32 = 20;
const LOW_CREDIT_THRESHOLD: u32 = 600;

/// Categorical summary of a screening score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the 0–100 screening score from raw provider results.
///
/// An absent credit score carries no penalty.
pub fn overall_score(results: &CheckResults) -> u8 {
    let mut score: i32 = 100;
    score -= CRIMINAL_RECORD_PENALTY * results.criminal_records.len() as i32;
    if let Some(credit) = results.credit_score {
        if credit < LOW_CREDIT_THRESHOLD {
            score -= LOW_CREDIT_PENALTY;
        }
    }
    score.clamp(0, 100) as u8
}

/// Maps a score onto a risk level: ≥80 low, ≥60 medium, else high.
pub fn risk_level(score: u8) -> RiskLevel {
    if score >= 80 {
        RiskLevel::Low
    } else if score >= 60 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::super::api::CriminalRecord;
    use super::*;

    fn results(records: usize, credit_score: Option<u32>) -> CheckResults {
        CheckResults {
            criminal_records: (0..records)
                .map(|i| CriminalRecord {
                    offense: format!("offense {}", i),
                    jurisdiction: None,
                    date: None,
                })
                .collect(),
            credit_score,
            employment_verification: vec![],
            reference_checks: vec![],
        }
    }

    #[test]
    fn test_clean_report_scores_100() {
        assert_eq!(overall_score(&results(0, Some(750))), 100);
    }

    #[test]
    fn test_criminal_records_cost_ten_each() {
        assert_eq!(overall_score(&results(1, Some(750))), 90);
        assert_eq!(overall_score(&results(2, Some(750))), 80);
        assert_eq!(overall_score(&results(4, Some(750))), 60);
    }

    #[test]
    fn test_low_credit_costs_twenty() {
        assert_eq!(overall_score(&results(0, Some(599))), 80);
        // Threshold is strictly below 600
        assert_eq!(overall_score(&results(0, Some(600))), 100);
    }

    #[test]
    fn test_missing_credit_score_no_penalty() {
        assert_eq!(overall_score(&results(0, None)), 100);
    }

    #[test]
    fn test_combined_penalties_and_clamp() {
        assert_eq!(overall_score(&results(3, Some(550))), 50);
        // 12 records + low credit would go negative without the clamp
        assert_eq!(overall_score(&results(12, Some(500))), 0);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(risk_level(100), RiskLevel::Low);
        assert_eq!(risk_level(80), RiskLevel::Low);
        assert_eq!(risk_level(79), RiskLevel::Medium);
        assert_eq!(risk_level(60), RiskLevel::Medium);
        assert_eq!(risk_level(59), RiskLevel::High);
        assert_eq!(risk_level(0), RiskLevel::High);
    }
}
