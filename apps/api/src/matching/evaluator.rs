//! Qualitative Evaluator: one structured reasoning call per (job, candidate) pair.
//!
//! The answer goes through parse-then-validate: a JSON document that misses a
//! section, a score, or carries a score outside 0..=100 is a structural failure
//! and the candidate is reported as failed. Scores are never guessed.
//! After validation the gap penalties are applied deterministically.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::MatchError;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::ReasoningService;
use crate::matching::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SCHEMA_HINT, EVALUATION_SYSTEM};
use crate::models::{CandidateSummary, JobDescriptor};

const REQUIRED_SECTIONS: [&str; 4] = [
    "job_analysis",
    "candidate_profile",
    "gap_analysis",
    "final_assessment",
];

const SKILL_PENALTY_CAP: f64 = 50.0;
const EXPERIENCE_PENALTY_CAP: f64 = 50.0;
const OTHER_PENALTY_CAP: f64 = 30.0;
const PENALTY_PER_GAP: f64 = 10.0;

const NOT_SPECIFIED: &str = "not specified";

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

/// The three qualitative sub-scores, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub skills: f64,
    pub experience: f64,
    pub other: f64,
}

/// A validated, gap-adjusted qualitative assessment.
///
/// `raw_scores` keeps the sub-scores as returned by the reasoning call so the
/// adjusted fields can be recomputed from a cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeResult {
    pub skills_score: f64,
    pub experience_score: f64,
    pub other_score: f64,
    pub raw_scores: SubScores,
    pub required_experience: String,
    pub actual_experience: String,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub matching_experience: Vec<String>,
    pub experience_gaps: Vec<String>,
    pub strengths: Vec<String>,
    pub significant_gaps: Vec<String>,
    #[serde(default)]
    pub fit_recommendation: String,
    pub candidate_name: String,
    pub years_of_experience: String,
    pub location: String,
    pub email: String,
    pub phone: String,
    pub validated: bool,
}

impl QualitativeResult {
    #[cfg(test)]
    pub fn adjusted_scores(&self) -> SubScores {
        SubScores {
            skills: self.skills_score,
            experience: self.experience_score,
            other: self.other_score,
        }
    }

    /// Recomputes the adjusted sub-scores from the stored raw scores and gap data.
    pub fn readjusted(mut self) -> Self {
        let adjusted = apply_gap_adjustment(
            self.raw_scores,
            self.missing_skills.len(),
            &self.required_experience,
            &self.actual_experience,
            self.significant_gaps.len(),
        );
        self.skills_score = adjusted.skills;
        self.experience_score = adjusted.experience;
        self.other_score = adjusted.other;
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid analysis structure: {0}")]
pub struct StructuralFailure(pub String);

// ────────────────────────────────────────────────────────────────────────────
// Gap adjustment
// ────────────────────────────────────────────────────────────────────────────

/// Applies the deterministic gap penalties to raw sub-scores:
/// - skills: -10 per missing skill, at most -50
/// - experience: -10 per missing year, at most -50, only when both year values parse
/// - other: -10 per significant gap, at most -30
///
/// All results are floored at 0.
pub fn apply_gap_adjustment(
    raw: SubScores,
    missing_skills: usize,
    required_experience: &str,
    actual_experience: &str,
    significant_gaps: usize,
) -> SubScores {
    let skills_penalty = (PENALTY_PER_GAP * missing_skills as f64).min(SKILL_PENALTY_CAP);

    let experience_penalty = match (
        leading_number(required_experience),
        leading_number(actual_experience),
    ) {
        (Some(required), Some(actual)) => {
            (PENALTY_PER_GAP * (required - actual).max(0.0)).min(EXPERIENCE_PENALTY_CAP)
        }
        _ => 0.0,
    };

    let other_penalty = (PENALTY_PER_GAP * significant_gaps as f64).min(OTHER_PENALTY_CAP);

    SubScores {
        skills: (raw.skills - skills_penalty).max(0.0),
        experience: (raw.experience - experience_penalty).max(0.0),
        other: (raw.other - other_penalty).max(0.0),
    }
}

/// Leading numeric value of a string such as "5 years", "3.5 ans" or "2+ yrs".
fn leading_number(text: &str) -> Option<f64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    digits.trim_end_matches('.').parse::<f64>().ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Parse then validate
// ────────────────────────────────────────────────────────────────────────────

/// A JSON scalar the model may use for numbers or free text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_score(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn into_text(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    gap_analysis: RawGapAnalysis,
    final_assessment: RawFinalAssessment,
}

#[derive(Debug, Default, Deserialize)]
struct RawGapAnalysis {
    #[serde(default)]
    experience_comparison: RawExperienceComparison,
    #[serde(default)]
    technical_skills: RawTechnicalSkills,
}

#[derive(Debug, Default, Deserialize)]
struct RawExperienceComparison {
    #[serde(default)]
    required: Option<Scalar>,
    #[serde(default)]
    actual: Option<Scalar>,
    #[serde(default, deserialize_with = "null_as_empty")]
    matching_experience: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    experience_gaps: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTechnicalSkills {
    #[serde(default, deserialize_with = "null_as_empty")]
    matching_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    missing_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawFinalAssessment {
    skills_score: Option<Scalar>,
    experience_score: Option<Scalar>,
    other_score: Option<Scalar>,
    #[serde(default, deserialize_with = "null_as_empty")]
    key_strengths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    significant_gaps: Vec<String>,
    #[serde(default)]
    fit_recommendation: Option<String>,
    candidate_name: Option<Scalar>,
    years_of_experience: Option<Scalar>,
    location: Option<Scalar>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

/// Lists the model leaves as `null` read as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn required_score(name: &str, value: Option<&Scalar>) -> Result<f64, StructuralFailure> {
    let value = value.ok_or_else(|| StructuralFailure(format!("missing {name} in final_assessment")))?;
    let score = value
        .as_score()
        .ok_or_else(|| StructuralFailure(format!("{name} is not numeric")))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(StructuralFailure(format!("{name} out of range (0-100): {score}")));
    }
    Ok(score)
}

fn required_text(name: &str, value: Option<Scalar>) -> Result<String, StructuralFailure> {
    value
        .map(Scalar::into_text)
        .ok_or_else(|| StructuralFailure(format!("missing {name} in final_assessment")))
}

/// Parses and validates a reasoning answer, then applies the gap adjustment.
/// `fallback_email` is used when the answer does not carry one.
pub fn parse_evaluation(document: &Value, fallback_email: &str) -> Result<QualitativeResult, StructuralFailure> {
    let object = document
        .as_object()
        .ok_or_else(|| StructuralFailure("answer is not a JSON object".to_string()))?;
    for section in REQUIRED_SECTIONS {
        match object.get(section) {
            Some(Value::Object(_)) => {}
            Some(_) => return Err(StructuralFailure(format!("section {section} is not an object"))),
            None => return Err(StructuralFailure(format!("missing main section: {section}"))),
        }
    }

    let raw: RawEvaluation = serde_json::from_value(document.clone())
        .map_err(|e| StructuralFailure(e.to_string()))?;
    let assessment = raw.final_assessment;

    let raw_scores = SubScores {
        skills: required_score("skills_score", assessment.skills_score.as_ref())?,
        experience: required_score("experience_score", assessment.experience_score.as_ref())?,
        other: required_score("other_score", assessment.other_score.as_ref())?,
    };
    let candidate_name = required_text("candidate_name", assessment.candidate_name)?;
    let years_of_experience = required_text("years_of_experience", assessment.years_of_experience)?;
    let location = required_text("location", assessment.location)?;

    let comparison = raw.gap_analysis.experience_comparison;
    let required_experience = comparison.required.map(Scalar::into_text).unwrap_or_default();
    let actual_experience = comparison.actual.map(Scalar::into_text).unwrap_or_default();
    let skills = raw.gap_analysis.technical_skills;

    let adjusted = apply_gap_adjustment(
        raw_scores,
        skills.missing_skills.len(),
        &required_experience,
        &actual_experience,
        assessment.significant_gaps.len(),
    );
    if adjusted != raw_scores {
        info!(
            "Adjusted scores for gaps: skills {} -> {}, experience {} -> {}, other {} -> {}",
            raw_scores.skills,
            adjusted.skills,
            raw_scores.experience,
            adjusted.experience,
            raw_scores.other,
            adjusted.other
        );
    }

    Ok(QualitativeResult {
        skills_score: adjusted.skills,
        experience_score: adjusted.experience,
        other_score: adjusted.other,
        raw_scores,
        required_experience,
        actual_experience,
        matching_skills: skills.matching_skills,
        missing_skills: skills.missing_skills,
        matching_experience: comparison.matching_experience,
        experience_gaps: comparison.experience_gaps,
        strengths: assessment.key_strengths,
        significant_gaps: assessment.significant_gaps,
        fit_recommendation: assessment.fit_recommendation.unwrap_or_default(),
        candidate_name,
        years_of_experience,
        location,
        email: assessment
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback_email.to_string()),
        phone: assessment
            .phone
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        validated: true,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator
// ────────────────────────────────────────────────────────────────────────────

pub struct QualitativeEvaluator {
    reasoning: Arc<dyn ReasoningService>,
    timeout: Duration,
}

impl QualitativeEvaluator {
    pub fn new(reasoning: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self { reasoning, timeout }
    }

    /// Evaluates one candidate against a job. Missing resume data, a failed or
    /// timed-out call, and structural failures all come back as `MatchError`.
    pub async fn evaluate(
        &self,
        job: &JobDescriptor,
        candidate: &CandidateSummary,
    ) -> Result<QualitativeResult, MatchError> {
        let resume = candidate
            .resume()
            .ok_or(MatchError::NoResumeData(candidate.id))?;

        let prompt = build_prompt(job, resume)
            .map_err(|e| MatchError::evaluation(candidate.id, e.to_string()))?;
        let system = format!("{EVALUATION_SYSTEM} {JSON_ONLY_SYSTEM}");

        info!("Requesting qualitative evaluation for candidate {}", candidate.id);
        let call = self
            .reasoning
            .complete_structured(&system, &prompt, EVALUATION_SCHEMA_HINT);
        let document = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                warn!("Reasoning call failed for candidate {}: {e}", candidate.id);
                return Err(MatchError::evaluation(candidate.id, e.to_string()));
            }
            Err(_) => {
                warn!("Reasoning call timed out for candidate {}", candidate.id);
                return Err(MatchError::evaluation(
                    candidate.id,
                    format!("evaluation timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        parse_evaluation(&document, &candidate.email).map_err(|e| {
            warn!("Rejected evaluation for candidate {}: {e}", candidate.id);
            MatchError::evaluation(candidate.id, e.to_string())
        })
    }
}

fn build_prompt(job: &JobDescriptor, resume: &Value) -> Result<String, serde_json::Error> {
    let resume_json = serde_json::to_string_pretty(resume)?;
    let description = if job.description.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        job.description.as_str()
    };
    Ok(EVALUATION_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{job_title}", &job.title)
        .replace("{job_description}", description)
        .replace(
            "{primary_skill}",
            job.primary_skill.as_deref().unwrap_or(NOT_SPECIFIED),
        )
        .replace("{job_type}", job.job_type.as_str())
        .replace("{resume_json}", &resume_json))
}
