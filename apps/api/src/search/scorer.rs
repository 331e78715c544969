use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::{CandidateId, JobDescriptor};
use crate::search::document::CandidateDocument;
use crate::search::query::{build_relevance_query, RelevanceQuery};
use crate::search::terms::{job_terms, TitleTerms};
use crate::search::{SearchEngine, SearchHit};

/// Raw engine scores are divided by this before clamping into `[min, 1.0]`.
pub const SCORE_SCALE: f64 = 8.0;

pub const GENERIC_MATCH_REASON: &str = "general profile match";
pub const MANUAL_MATCH_REASON: &str = "manually specified candidate";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevanceResult {
    pub candidate_id: CandidateId,
    pub normalized_score: f64,
    pub raw_engine_score: f64,
    pub match_reason: String,
}

impl RelevanceResult {
    /// Relevance for a candidate the engine did not return.
    pub fn floor(candidate_id: CandidateId, floor: f64) -> Self {
        Self {
            candidate_id,
            normalized_score: floor,
            raw_engine_score: 0.0,
            match_reason: MANUAL_MATCH_REASON.to_string(),
        }
    }
}

/// Finds and scores candidates for a job against the search engine.
///
/// Engine failures and timeouts never surface as errors: `find_candidates`
/// degrades to an empty list and `score_single_candidate` to the floor score.
#[derive(Clone)]
pub struct SearchRelevanceScorer {
    engine: Arc<dyn SearchEngine>,
    timeout: Duration,
    relevance_floor: f64,
}

impl SearchRelevanceScorer {
    pub fn new(engine: Arc<dyn SearchEngine>, timeout: Duration, relevance_floor: f64) -> Self {
        Self {
            engine,
            timeout,
            relevance_floor,
        }
    }

    /// Up to `limit` candidates in engine relevance order.
    pub async fn find_candidates(
        &self,
        job: &JobDescriptor,
        limit: usize,
        min_score: f64,
    ) -> Vec<RelevanceResult> {
        if limit == 0 {
            return Vec::new();
        }
        let terms = job_terms(job);
        let query = build_relevance_query(job, &terms, limit);
        let hits = self.run(&query).await;

        let results: Vec<RelevanceResult> = hits
            .into_iter()
            .take(limit)
            .map(|hit| to_result(job, &terms, hit, min_score))
            .collect();

        if results.is_empty() {
            warn!("No candidates found for job {}", job.id);
        } else {
            info!("Found {} candidates for job {}", results.len(), job.id);
        }
        results
    }

    /// Scores one candidate with the job's query restricted to that id.
    pub async fn score_single_candidate(
        &self,
        job: &JobDescriptor,
        candidate_id: CandidateId,
    ) -> RelevanceResult {
        let terms = job_terms(job);
        let query = build_relevance_query(job, &terms, 1).restricted_to(vec![candidate_id]);

        self.run(&query)
            .await
            .into_iter()
            .find(|hit| hit.id == candidate_id)
            .map(|hit| to_result(job, &terms, hit, self.relevance_floor))
            .unwrap_or_else(|| RelevanceResult::floor(candidate_id, self.relevance_floor))
    }

    async fn run(&self, query: &RelevanceQuery) -> Vec<SearchHit> {
        match tokio::time::timeout(self.timeout, self.engine.query(query)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!("Search backend unavailable, returning no results: {e}");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Search query timed out after {}s, returning no results",
                    self.timeout.as_secs()
                );
                Vec::new()
            }
        }
    }
}

fn to_result(job: &JobDescriptor, terms: &TitleTerms, hit: SearchHit, min_score: f64) -> RelevanceResult {
    RelevanceResult {
        candidate_id: hit.id,
        normalized_score: normalize_score(hit.score, min_score),
        raw_engine_score: hit.score,
        match_reason: match_reason(&hit.document, terms, job.primary_skill.as_deref()),
    }
}

pub fn normalize_score(raw: f64, min_score: f64) -> f64 {
    (raw / SCORE_SCALE).max(min_score).min(1.0)
}

/// Human-readable reason for a hit, by priority: domain term in the current
/// title, position term in the current title, domain term in a skill name,
/// the primary skill itself, domain term in an experience title.
pub fn match_reason(doc: &CandidateDocument, terms: &TitleTerms, primary_skill: Option<&str>) -> String {
    let title = doc.job_title.as_deref().unwrap_or_default();
    let title_lower = title.to_lowercase();

    let title_domain = contained_terms(&terms.domain, &title_lower);
    if !title_domain.is_empty() {
        return format!("Similar domain: {title} (terms: {})", title_domain.join(", "));
    }
    if !title_lower.is_empty() && !contained_terms(&terms.position, &title_lower).is_empty() {
        return format!("Similar position: {title}");
    }

    let skills: Vec<String> = doc.skill_names().map(str::to_lowercase).collect();
    for term in &terms.domain {
        if let Some(skill) = skills.iter().find(|s| s.contains(term.as_str())) {
            return format!("Skills in {term}: {skill}");
        }
    }
    if let Some(primary) = primary_skill.map(str::trim).filter(|p| !p.is_empty()) {
        let primary_lower = primary.to_lowercase();
        if skills.iter().any(|s| s.contains(&primary_lower)) {
            return format!("Key skill: {primary}");
        }
    }

    for exp in &doc.experiences {
        let matched = contained_terms(&terms.domain, &exp.job_title.to_lowercase());
        if !matched.is_empty() {
            let duration = exp
                .duration
                .as_deref()
                .map(|d| format!(" (duration: {d})"))
                .unwrap_or_default();
            return format!("Experience in {}: {}{duration}", matched.join(", "), exp.job_title);
        }
    }

    GENERIC_MATCH_REASON.to_string()
}

/// At most two terms found (as substrings) in `haystack`.
fn contained_terms<'a>(terms: &'a [String], haystack: &str) -> Vec<&'a str> {
    terms
        .iter()
        .filter(|t| haystack.contains(t.as_str()))
        .map(String::as_str)
        .take(2)
        .collect()
}
