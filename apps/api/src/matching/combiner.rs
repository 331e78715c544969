//! Score Combiner: blends the relevance signal with the qualitative sub-scores.
//!
//! Two named strategies exist and both stay selectable:
//! - `TwoFactor`: qualitative = 0.5 skills + 0.5 experience
//! - `ThreeFactor`: qualitative = 0.4 skills + 0.4 experience + 0.2 other
//!
//! In both, combined = round(100 * (0.6 * qualitative + 0.4 * relevance)).
//! Match quality uses the default threshold table for `TwoFactor` and the
//! job-type table for `ThreeFactor`.

use serde::{Deserialize, Serialize};

use crate::matching::evaluator::QualitativeResult;
use crate::models::{CandidateId, JobType};
use crate::search::scorer::RelevanceResult;

const QUALITATIVE_WEIGHT: f64 = 0.6;
const RELEVANCE_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationStrategy {
    #[default]
    TwoFactor,
    ThreeFactor,
}

impl CombinationStrategy {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "two_factor" | "two-factor" => Some(Self::TwoFactor),
            "three_factor" | "three-factor" => Some(Self::ThreeFactor),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TwoFactor => "two_factor",
            Self::ThreeFactor => "three_factor",
        }
    }

    /// Human-readable formula, reported with every match run.
    pub fn methodology(&self) -> &'static str {
        match self {
            Self::TwoFactor => {
                "combined = 60% qualitative (50% skills + 50% experience) + 40% search relevance"
            }
            Self::ThreeFactor => {
                "combined = 60% qualitative (40% skills + 40% experience + 20% other) + 40% search relevance"
            }
        }
    }

    /// Weighted blend of the sub-scores, in 0..=100.
    pub fn qualitative_aggregate(&self, qualitative: &QualitativeResult) -> f64 {
        match self {
            Self::TwoFactor => 0.5 * qualitative.skills_score + 0.5 * qualitative.experience_score,
            Self::ThreeFactor => {
                0.4 * qualitative.skills_score
                    + 0.4 * qualitative.experience_score
                    + 0.2 * qualitative.other_score
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchQuality {
    Excellent,
    VeryGood,
    Good,
    Average,
    Weak,
}

/// Inclusive lower bounds for Excellent, VeryGood, Good, Average.
type Thresholds = [u8; 4];

const DEFAULT_THRESHOLDS: Thresholds = [85, 70, 60, 50];
const TECHNICAL_THRESHOLDS: Thresholds = [80, 70, 60, 50];
const NON_TECHNICAL_THRESHOLDS: Thresholds = [75, 65, 55, 45];

impl MatchQuality {
    fn classify(percent: u8, thresholds: Thresholds) -> Self {
        let [excellent, very_good, good, average] = thresholds;
        if percent >= excellent {
            Self::Excellent
        } else if percent >= very_good {
            Self::VeryGood
        } else if percent >= good {
            Self::Good
        } else if percent >= average {
            Self::Average
        } else {
            Self::Weak
        }
    }

    /// Default table: 85 / 70 / 60 / 50.
    pub fn from_percent(percent: u8) -> Self {
        Self::classify(percent, DEFAULT_THRESHOLDS)
    }

    /// Job-type table: technical 80 / 70 / 60 / 50, functional and hybrid 75 / 65 / 55 / 45.
    pub fn for_job_type(percent: u8, job_type: JobType) -> Self {
        match job_type {
            JobType::Technical => Self::classify(percent, TECHNICAL_THRESHOLDS),
            JobType::Functional | JobType::Hybrid => Self::classify(percent, NON_TECHNICAL_THRESHOLDS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedResult {
    pub candidate_id: CandidateId,
    pub combined_score_percent: u8,
    pub match_quality: MatchQuality,
    pub strategy: CombinationStrategy,
    pub relevance: RelevanceResult,
    pub qualitative: QualitativeResult,
}

/// Pure combination of one candidate's signals.
pub fn combine(
    strategy: CombinationStrategy,
    job_type: JobType,
    relevance: RelevanceResult,
    qualitative: QualitativeResult,
) -> CombinedResult {
    let aggregate = strategy.qualitative_aggregate(&qualitative) / 100.0;
    let blended = 100.0 * (aggregate * QUALITATIVE_WEIGHT + relevance.normalized_score * RELEVANCE_WEIGHT);
    let combined_score_percent = blended.round().clamp(0.0, 100.0) as u8;

    let match_quality = match strategy {
        CombinationStrategy::TwoFactor => MatchQuality::from_percent(combined_score_percent),
        CombinationStrategy::ThreeFactor => MatchQuality::for_job_type(combined_score_percent, job_type),
    };

    CombinedResult {
        candidate_id: relevance.candidate_id,
        combined_score_percent,
        match_quality,
        strategy,
        relevance,
        qualitative,
    }
}
