//! Test doubles for the matching pipeline: a scripted reasoning service and
//! in-memory record and analysis stores.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::llm_client::{LlmError, ReasoningService};
use crate::matching::cache::AnalysisStore;
use crate::models::analysis::AnalysisCacheRow;
use crate::models::records::RecordSource;
use crate::models::{CandidateId, CandidateSummary, JobDescriptor, JobId, JobType};

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn sample_job() -> JobDescriptor {
    JobDescriptor {
        id: 1,
        title: "Ingénieur DevOps".to_string(),
        description: "Build and run our Kubernetes platform".to_string(),
        primary_skill: Some("Kubernetes".to_string()),
        job_type: JobType::Technical,
    }
}

pub fn sample_candidate(id: CandidateId) -> CandidateSummary {
    CandidateSummary {
        id,
        name: format!("Candidate {id}"),
        email: format!("candidate{id}@example.com"),
        current_job_title: Some("DevOps Engineer".to_string()),
        structured_resume: Some(json!({
            "job_title": "DevOps Engineer",
            "hard_skills": ["Kubernetes", "Terraform"],
            "experiences": [{
                "job_title": "DevOps Engineer",
                "company": "Acme",
                "duration": "4 years"
            }]
        })),
    }
}

/// A well-formed evaluation answer. Required and actual experience are equal,
/// so only missing skills and significant gaps move the scores.
pub fn evaluation_json(
    skills: f64,
    experience: f64,
    other: f64,
    missing_skills: usize,
    significant_gaps: usize,
) -> Value {
    let missing: Vec<String> = (1..=missing_skills).map(|i| format!("Missing {i}")).collect();
    let gaps: Vec<String> = (1..=significant_gaps).map(|i| format!("Gap {i}")).collect();
    json!({
        "job_analysis": {
            "required_experience": "3 years",
            "key_technical_skills": ["Kubernetes"],
            "domain_expertise": ["Cloud"],
            "soft_skills": ["Communication"]
        },
        "candidate_profile": {
            "total_relevant_experience": "3 years",
            "technical_skills": ["Kubernetes"],
            "domain_expertise": ["Cloud"],
            "education_certifications": []
        },
        "gap_analysis": {
            "experience_comparison": {
                "required": "3 years",
                "actual": "3 years",
                "matching_experience": ["Platform operations"],
                "experience_gaps": []
            },
            "technical_skills": {
                "matching_skills": ["Kubernetes"],
                "missing_skills": missing
            },
            "domain_knowledge": {"fit_assessment": "good", "strengths": [], "gaps": []},
            "soft_skills": {"alignment": "good", "strengths": [], "areas_for_development": []}
        },
        "final_assessment": {
            "skills_score": skills,
            "experience_score": experience,
            "other_score": other,
            "key_strengths": ["Kubernetes"],
            "significant_gaps": gaps,
            "fit_recommendation": "Proceed",
            "candidate_name": "Ada",
            "years_of_experience": "3 years",
            "location": "Paris"
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Reasoning service
// ────────────────────────────────────────────────────────────────────────────

/// Answers from a queue, then with `repeat` (or an API error when unset).
#[derive(Default)]
pub struct ScriptedReasoning {
    answers: Mutex<VecDeque<Result<Value, LlmError>>>,
    repeat: Option<Value>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoning {
    pub fn always(answer: Value) -> Self {
        Self {
            repeat: Some(answer),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn sequence(answers: Vec<Result<Value, LlmError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete_structured(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _schema_hint: &str,
    ) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.answers.lock().unwrap().pop_front();
        match (queued, &self.repeat) {
            (Some(answer), _) => answer,
            (None, Some(answer)) => Ok(answer.clone()),
            (None, None) => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRecords {
    jobs: HashMap<JobId, JobDescriptor>,
    candidates: HashMap<CandidateId, CandidateSummary>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, job: JobDescriptor) -> Self {
        self.jobs.insert(job.id, job);
        self
    }

    pub fn with_candidate(mut self, candidate: CandidateSummary) -> Self {
        self.candidates.insert(candidate.id, candidate);
        self
    }
}

#[async_trait]
impl RecordSource for MemoryRecords {
    async fn get_job(&self, job_id: JobId) -> Result<JobDescriptor, AppError> {
        self.jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job with ID {job_id} not found")))
    }

    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<CandidateSummary, AppError> {
        self.candidates
            .get(&candidate_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Candidate with ID {candidate_id} not found")))
    }

    /// Higher ids count as more recent.
    async fn list_candidate_ids(&self, limit: Option<usize>) -> Result<Vec<CandidateId>, AppError> {
        let mut ids: Vec<CandidateId> = self.candidates.keys().copied().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        Ok(ids)
    }

    async fn count_candidates(&self) -> Result<u64, AppError> {
        Ok(self.candidates.len() as u64)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAnalysisStore {
    rows: RwLock<BTreeMap<(JobId, CandidateId), AnalysisCacheRow>>,
    next_id: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn row(&self, job_id: JobId, candidate_id: CandidateId) -> Option<AnalysisCacheRow> {
        self.rows.read().unwrap().get(&(job_id, candidate_id)).cloned()
    }

    /// Stores `analysis_json` verbatim, bypassing serialization.
    pub fn insert_raw(&self, job_id: JobId, candidate_id: CandidateId, analysis_json: &str) {
        let row = self.new_row(job_id, candidate_id, "", "", analysis_json);
        self.rows.write().unwrap().insert((job_id, candidate_id), row);
    }

    fn new_row(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        job_title: &str,
        candidate_name: &str,
        analysis_json: &str,
    ) -> AnalysisCacheRow {
        AnalysisCacheRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) as i32 + 1,
            job_id,
            candidate_id,
            job_title: job_title.to_string(),
            candidate_name: candidate_name.to_string(),
            analysis_json: analysis_json.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn fetch(&self, job_id: JobId, candidate_id: CandidateId) -> Result<Option<AnalysisCacheRow>> {
        Ok(self.row(job_id, candidate_id))
    }

    async fn upsert(
        &self,
        job_id: JobId,
        candidate_id: CandidateId,
        job_title: &str,
        candidate_name: &str,
        analysis_json: &str,
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        let mut rows = self.rows.write().unwrap();
        match rows.get_mut(&(job_id, candidate_id)) {
            Some(row) => {
                row.job_title = job_title.to_string();
                row.candidate_name = candidate_name.to_string();
                row.analysis_json = analysis_json.to_string();
                row.updated_at = Some(Utc::now());
            }
            None => {
                let row = self.new_row(job_id, candidate_id, job_title, candidate_name, analysis_json);
                rows.insert((job_id, candidate_id), row);
            }
        }
        Ok(())
    }

    async fn delete(&self, job_id: Option<JobId>, candidate_id: Option<CandidateId>) -> Result<u64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|(job, candidate), _| {
            let job_matches = job_id.map_or(true, |j| j == *job);
            let candidate_matches = candidate_id.map_or(true, |c| c == *candidate);
            !(job_matches && candidate_matches)
        });
        Ok((before - rows.len()) as u64)
    }
}
