//! Matching Orchestrator: end-to-end matching run for one job.
//!
//! Pipeline per run:
//! 1. Resolve the job (a missing job aborts the run)
//! 2. Build the working set: search suggestions in auto mode, or the explicit
//!    ids each scored against the job's relevance query
//! 3. Per candidate, sequentially: require resume data, then cache lookup,
//!    else evaluate and cache
//! 4. Combine relevance and qualitative signals
//! 5. Order successes by combined score, then append failures in input order
//!
//! Per-candidate failures never abort the run; they become failed entries.
//! Dropping the run future cancels it between candidates; results already
//! cached stay cached.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::{AppError, MatchError};
use crate::matching::cache::AnalysisCache;
use crate::matching::combiner::{combine, CombinationStrategy, CombinedResult};
use crate::matching::evaluator::QualitativeEvaluator;
use crate::models::records::RecordSource;
use crate::models::{CandidateId, JobDescriptor, JobId, JobType};
use crate::search::scorer::{RelevanceResult, SearchRelevanceScorer};

pub const DEFAULT_LIMIT: usize = 5;
pub const DEFAULT_MIN_SCORE: f64 = 0.1;

const AUTO_SOURCE: &str = "search_suggestion";
const NO_MATCHES_MESSAGE: &str =
    "No candidates matching this job were found by the search engine. Try another job title or primary skill.";

// ────────────────────────────────────────────────────────────────────────────
// Request / report types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSelection {
    /// Let the search engine pick the working set.
    Auto,
    Explicit(Vec<CandidateId>),
}

impl CandidateSelection {
    /// An empty id list means auto mode.
    pub fn from_ids(ids: Vec<CandidateId>) -> Self {
        if ids.is_empty() {
            Self::Auto
        } else {
            Self::Explicit(ids)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Working set bound in auto mode.
    pub limit: usize,
    /// Normalisation floor for relevance scores in auto mode.
    pub min_score: f64,
    /// Overrides the configured combination strategy for this run.
    pub strategy: Option<CombinationStrategy>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
            strategy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: JobId,
    pub title: String,
    pub primary_skill: Option<String>,
    pub job_type: JobType,
}

impl From<&JobDescriptor> for JobInfo {
    fn from(job: &JobDescriptor) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            primary_skill: job.primary_skill.clone(),
            job_type: job.job_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessfulAnalysis {
    pub candidate_name: String,
    pub email: String,
    #[serde(flatten)]
    pub result: CombinedResult,
    pub match_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisEntry {
    Success(SuccessfulAnalysis),
    Failed {
        candidate_id: CandidateId,
        error: String,
    },
}

#[cfg(test)]
impl AnalysisEntry {
    pub fn candidate_id(&self) -> CandidateId {
        match self {
            AnalysisEntry::Success(success) => success.result.candidate_id,
            AnalysisEntry::Failed { candidate_id, .. } => *candidate_id,
        }
    }

    pub fn combined_score_percent(&self) -> Option<u8> {
        match self {
            AnalysisEntry::Success(success) => Some(success.result.combined_score_percent),
            AnalysisEntry::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub job_info: JobInfo,
    /// Number of candidates attempted, successful or not.
    pub total_analyzed: usize,
    pub analyses: Vec<AnalysisEntry>,
    pub search_method: SearchMethod,
    pub strategy: CombinationStrategy,
    pub score_methodology: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct MatchingOrchestrator {
    records: Arc<dyn RecordSource>,
    scorer: SearchRelevanceScorer,
    evaluator: QualitativeEvaluator,
    cache: AnalysisCache,
    default_strategy: CombinationStrategy,
}

impl MatchingOrchestrator {
    pub fn new(
        records: Arc<dyn RecordSource>,
        scorer: SearchRelevanceScorer,
        evaluator: QualitativeEvaluator,
        cache: AnalysisCache,
        default_strategy: CombinationStrategy,
    ) -> Self {
        Self {
            records,
            scorer,
            evaluator,
            cache,
            default_strategy,
        }
    }

    /// Runs one matching request. Only an unknown job (or a failure to load it)
    /// is an error; everything per-candidate is reported inside the report.
    pub async fn run_match(
        &self,
        job_id: JobId,
        selection: CandidateSelection,
        options: MatchOptions,
    ) -> Result<MatchReport, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run_match", %run_id, job_id);
        self.run(run_id, job_id, selection, options)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: Uuid,
        job_id: JobId,
        selection: CandidateSelection,
        options: MatchOptions,
    ) -> Result<MatchReport, AppError> {
        let job = self.records.get_job(job_id).await?;
        let strategy = options.strategy.unwrap_or(self.default_strategy);

        let (search_method, working_set) = match selection {
            CandidateSelection::Auto => {
                let suggestions = self
                    .scorer
                    .find_candidates(&job, options.limit, options.min_score)
                    .await;
                (SearchMethod::Auto, suggestions)
            }
            CandidateSelection::Explicit(ids) => {
                let mut seen = HashSet::new();
                let mut scored = Vec::with_capacity(ids.len());
                for id in ids.into_iter().filter(|id| seen.insert(*id)) {
                    scored.push(self.scorer.score_single_candidate(&job, id).await);
                }
                (SearchMethod::Manual, scored)
            }
        };

        let mut report = MatchReport {
            run_id,
            job_info: JobInfo::from(&job),
            total_analyzed: working_set.len(),
            analyses: Vec::with_capacity(working_set.len()),
            search_method,
            strategy,
            score_methodology: strategy.methodology().to_string(),
            message: None,
        };

        if working_set.is_empty() {
            info!("No candidates to analyze for job {job_id}");
            report.message = Some(NO_MATCHES_MESSAGE.to_string());
            return Ok(report);
        }

        info!(
            "Analyzing {} candidates for job {job_id} ({:?}, {})",
            working_set.len(),
            search_method,
            strategy.label()
        );

        let source = (search_method == SearchMethod::Auto).then_some(AUTO_SOURCE);
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for relevance in working_set {
            let candidate_id = relevance.candidate_id;
            match self.analyze_candidate(&job, relevance, strategy, source).await {
                Ok(success) => successes.push(success),
                Err(e) => {
                    warn!("Candidate {candidate_id} failed: {e}");
                    failures.push(AnalysisEntry::Failed {
                        candidate_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        successes.sort_by(|a: &SuccessfulAnalysis, b: &SuccessfulAnalysis| {
            b.result
                .combined_score_percent
                .cmp(&a.result.combined_score_percent)
                .then(a.result.candidate_id.cmp(&b.result.candidate_id))
        });

        info!(
            "Match run finished for job {job_id}: {} succeeded, {} failed",
            successes.len(),
            failures.len()
        );

        report.analyses = successes
            .into_iter()
            .map(AnalysisEntry::Success)
            .chain(failures)
            .collect();
        Ok(report)
    }

    async fn analyze_candidate(
        &self,
        job: &JobDescriptor,
        relevance: RelevanceResult,
        strategy: CombinationStrategy,
        source: Option<&'static str>,
    ) -> Result<SuccessfulAnalysis, MatchError> {
        let candidate_id = relevance.candidate_id;
        let candidate = self
            .records
            .get_candidate(candidate_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => MatchError::CandidateNotFound(candidate_id),
                other => MatchError::Lookup {
                    candidate_id,
                    reason: other.to_string(),
                },
            })?;
        if candidate.resume().is_none() {
            return Err(MatchError::NoResumeData(candidate_id));
        }

        let (qualitative, from_cache) = match self.cache.get(job.id, candidate_id).await {
            Some(cached) => (cached.readjusted(), true),
            None => {
                let fresh = self.evaluator.evaluate(job, &candidate).await?;
                if !self
                    .cache
                    .put(job.id, candidate_id, &job.title, &candidate.name, &fresh)
                    .await
                {
                    warn!("Returning uncached analysis for candidate {candidate_id}");
                }
                (fresh, false)
            }
        };

        let match_reason = relevance.match_reason.clone();
        Ok(SuccessfulAnalysis {
            candidate_name: candidate.name,
            email: candidate.email,
            result: combine(strategy, job.job_type, relevance, qualitative),
            match_reason,
            source,
            from_cache,
        })
    }
}
