//! Engine-neutral relevance query descriptor and the job-to-query builder.

use crate::models::{CandidateId, JobDescriptor};
use crate::search::terms::{TitleTerms, EXCLUDED_TITLE_TERMS};

pub const PHRASE_TITLE_BOOST: f64 = 3.0;
pub const DOMAIN_TITLE_BOOST: f64 = 5.0;
pub const DOMAIN_EXPERIENCE_TITLE_BOOST: f64 = 4.0;
pub const PRIMARY_SKILL_BOOST: f64 = 2.5;
pub const DOMAIN_SKILL_BOOST: f64 = 2.0;
pub const POSITION_TITLE_BOOST: f64 = 0.5;
pub const DOMAIN_RESPONSIBILITIES_BOOST: f64 = 1.5;

/// Share of query terms that must match for domain clauses to count.
const DOMAIN_MINIMUM_SHOULD_MATCH: u8 = 30;

/// Searchable candidate fields. Experience and skill fields are repeated
/// sub-entities; clauses over them aggregate by max across entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CurrentTitle,
    HardSkills,
    ExperienceTitle,
    ExperienceResponsibilities,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    /// Whole text must appear as a phrase.
    Phrase { field: Field, text: String },
    /// Any of the terms; at least `minimum_should_match` percent of them when set.
    Match {
        field: Field,
        terms: Vec<String>,
        minimum_should_match: Option<u8>,
    },
    /// Best single field wins, each field scaled by its own boost.
    MultiMatch {
        text: String,
        fields: Vec<(Field, f64)>,
        minimum_should_match: Option<u8>,
    },
    /// Exact (case-insensitive) membership of any term.
    Terms { field: Field, terms: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub boost: f64,
}

/// Weighted disjunction of `should` clauses, minus anything matching `must_not`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceQuery {
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
    /// When set, only these candidates may be returned.
    pub restrict_to: Option<Vec<CandidateId>>,
    pub size: usize,
}

impl RelevanceQuery {
    pub fn restricted_to(mut self, ids: Vec<CandidateId>) -> Self {
        self.size = self.size.max(ids.len());
        self.restrict_to = Some(ids);
        self
    }
}

/// Builds the relevance query for a job, in descending clause priority.
/// Clauses whose input is empty are omitted.
pub fn build_relevance_query(job: &JobDescriptor, terms: &TitleTerms, size: usize) -> RelevanceQuery {
    let mut should = Vec::new();
    let title = job.title.trim();

    if !title.is_empty() {
        should.push(Clause {
            kind: ClauseKind::Phrase {
                field: Field::CurrentTitle,
                text: title.to_string(),
            },
            boost: PHRASE_TITLE_BOOST,
        });
    }

    if !terms.domain.is_empty() {
        should.push(Clause {
            kind: ClauseKind::Match {
                field: Field::CurrentTitle,
                terms: terms.domain.clone(),
                minimum_should_match: Some(DOMAIN_MINIMUM_SHOULD_MATCH),
            },
            boost: DOMAIN_TITLE_BOOST,
        });
        should.push(Clause {
            kind: ClauseKind::Match {
                field: Field::ExperienceTitle,
                terms: terms.domain.clone(),
                minimum_should_match: Some(DOMAIN_MINIMUM_SHOULD_MATCH),
            },
            boost: DOMAIN_EXPERIENCE_TITLE_BOOST,
        });
    }

    if let Some(skill) = job.primary_skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        should.push(Clause {
            kind: ClauseKind::MultiMatch {
                text: skill.to_string(),
                fields: vec![(Field::CurrentTitle, 1.5), (Field::HardSkills, 2.0)],
                minimum_should_match: Some(DOMAIN_MINIMUM_SHOULD_MATCH),
            },
            boost: PRIMARY_SKILL_BOOST,
        });
    }

    if !terms.domain.is_empty() {
        should.push(Clause {
            kind: ClauseKind::Terms {
                field: Field::HardSkills,
                terms: terms.domain.clone(),
            },
            boost: DOMAIN_SKILL_BOOST,
        });
    }

    if !terms.position.is_empty() {
        should.push(Clause {
            kind: ClauseKind::Match {
                field: Field::CurrentTitle,
                terms: terms.position.clone(),
                minimum_should_match: None,
            },
            boost: POSITION_TITLE_BOOST,
        });
    }

    if !terms.domain.is_empty() {
        should.push(Clause {
            kind: ClauseKind::Match {
                field: Field::ExperienceResponsibilities,
                terms: terms.domain.clone(),
                minimum_should_match: None,
            },
            boost: DOMAIN_RESPONSIBILITIES_BOOST,
        });
    }

    RelevanceQuery {
        should,
        must_not: vec![Clause {
            kind: ClauseKind::Match {
                field: Field::CurrentTitle,
                terms: EXCLUDED_TITLE_TERMS.iter().map(|t| t.to_string()).collect(),
                minimum_should_match: None,
            },
            boost: 1.0,
        }],
        restrict_to: None,
        size,
    }
}
