//! In-process search engine. Evaluates the relevance query descriptor lexically
//! over documents held in memory; used when no external search backend is configured.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::CandidateId;
use crate::search::document::CandidateDocument;
use crate::search::query::{Clause, ClauseKind, Field, RelevanceQuery};
use crate::search::terms::tokenize;
use crate::search::{SearchEngine, SearchError, SearchHit};

#[derive(Default)]
pub struct InMemorySearchEngine {
    documents: RwLock<BTreeMap<CandidateId, CandidateDocument>>,
}

impl InMemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl SearchEngine for InMemorySearchEngine {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn query(&self, query: &RelevanceQuery) -> Result<Vec<SearchHit>, SearchError> {
        let documents = self.documents.read().await;

        let mut hits: Vec<SearchHit> = documents
            .values()
            .filter(|doc| {
                query
                    .restrict_to
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&doc.id))
            })
            .filter(|doc| !query.must_not.iter().any(|c| clause_weight(c, doc) > 0.0))
            .filter_map(|doc| {
                let score: f64 = query
                    .should
                    .iter()
                    .map(|c| clause_weight(c, doc) * c.boost)
                    .sum();
                (score > 0.0).then(|| SearchHit {
                    id: doc.id,
                    score,
                    document: doc.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(query.size);
        Ok(hits)
    }

    async fn index_candidate(&self, document: &CandidateDocument) -> Result<(), SearchError> {
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn document_count(&self) -> Result<u64, SearchError> {
        Ok(self.len().await as u64)
    }
}

/// Field contents, one entry per sub-entity for repeated fields.
fn field_texts<'a>(doc: &'a CandidateDocument, field: Field) -> Vec<&'a str> {
    match field {
        Field::CurrentTitle => doc.job_title.as_deref().into_iter().collect(),
        Field::HardSkills => doc.skill_names().collect(),
        Field::ExperienceTitle => doc.experiences.iter().map(|e| e.job_title.as_str()).collect(),
        Field::ExperienceResponsibilities => doc
            .experiences
            .iter()
            .filter_map(|e| e.responsibilities.as_deref())
            .collect(),
    }
}

/// Unboosted weight of one clause against one document, in [0, max field boost].
fn clause_weight(clause: &Clause, doc: &CandidateDocument) -> f64 {
    match &clause.kind {
        ClauseKind::Phrase { field, text } => {
            let phrase = tokenize(text).join(" ");
            if phrase.is_empty() {
                return 0.0;
            }
            let found = field_texts(doc, *field)
                .iter()
                .any(|t| contains_phrase(&tokenize(t).join(" "), &phrase));
            if found {
                1.0
            } else {
                0.0
            }
        }
        ClauseKind::Match {
            field,
            terms,
            minimum_should_match,
        } => {
            let query_tokens = query_tokens(terms.iter().map(String::as_str));
            best_over(doc, *field, |t| {
                match_fraction(&query_tokens, t, *minimum_should_match)
            })
        }
        ClauseKind::MultiMatch {
            text,
            fields,
            minimum_should_match,
        } => {
            let query_tokens = query_tokens(std::iter::once(text.as_str()));
            fields
                .iter()
                .map(|(field, field_boost)| {
                    best_over(doc, *field, |t| {
                        match_fraction(&query_tokens, t, *minimum_should_match)
                    }) * field_boost
                })
                .fold(0.0, f64::max)
        }
        ClauseKind::Terms { field, terms } => {
            let wanted: HashSet<String> = terms.iter().map(|t| t.trim().to_lowercase()).collect();
            let found = field_texts(doc, *field)
                .iter()
                .any(|t| wanted.contains(&t.trim().to_lowercase()));
            if found {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Max aggregation over the entries of a (possibly repeated) field.
fn best_over(doc: &CandidateDocument, field: Field, score: impl Fn(&str) -> f64) -> f64 {
    field_texts(doc, field)
        .into_iter()
        .map(score)
        .fold(0.0, f64::max)
}

fn query_tokens<'a>(texts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    texts
        .flat_map(tokenize)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Share of query tokens present in `text`; zero below `minimum_should_match` percent.
fn match_fraction(query_tokens: &[String], text: &str, minimum_should_match: Option<u8>) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let field_tokens: HashSet<String> = tokenize(text).into_iter().collect();
    let matched = query_tokens
        .iter()
        .filter(|t| field_tokens.contains(*t))
        .count();
    let fraction = matched as f64 / query_tokens.len() as f64;
    let required = f64::from(minimum_should_match.unwrap_or(0)) / 100.0;
    if matched == 0 || fraction < required {
        0.0
    } else {
        fraction
    }
}

/// Token-boundary phrase containment on space-joined token strings.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}
