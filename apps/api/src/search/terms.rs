//! Title term extraction: splits a job title into position terms (seniority and
//! role words, down-weighted in matching) and domain terms (subject matter).

use crate::models::JobDescriptor;

/// Common seniority/role words in English and French.
pub const POSITION_TERMS: &[&str] = &[
    "senior",
    "junior",
    "confirmé",
    "confirme",
    "consultant",
    "consultante",
    "engineer",
    "ingénieur",
    "ingenieur",
    "ingénieure",
    "manager",
    "director",
    "directeur",
    "directrice",
    "lead",
    "chief",
    "chef",
    "head",
    "expert",
    "experte",
    "specialist",
    "spécialiste",
    "analyste",
    "analyst",
    "développeur",
    "developpeur",
    "développeuse",
    "developer",
    "architecte",
    "architect",
    "responsable",
    "principal",
    "staff",
];

/// Words that introduce the domain phrase: "Consultant en Data", "Engineer in Robotics".
const CONNECTORS: &[&str] = &["en", "in"];

const STOP_WORDS: &[&str] = &[
    "en", "de", "du", "des", "et", "a", "à", "le", "la", "les", "d'", "l'", "in", "of", "and",
    "the", "for", "&",
];

/// Titles matching any of these are excluded from relevance results.
pub const EXCLUDED_TITLE_TERMS: &[&str] = &[
    "stagiaire",
    "stage",
    "intern",
    "internship",
    "étudiant",
    "étudiante",
    "etudiant",
    "student",
    "alternance",
    "alternant",
    "alternante",
    "élève",
    "apprenti",
    "apprentie",
    "apprentice",
    "trainee",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleTerms {
    pub position: Vec<String>,
    pub domain: Vec<String>,
}

/// Lowercases and splits on whitespace and list separators, trimming edge punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '/' || c == ',' || c == ';')
        .map(|w| {
            w.trim_matches(|c: char| matches!(c, '(' | ')' | '"' | ':' | '!' | '?' | '|' | '-' | '–'))
        })
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_position_term(word: &str) -> bool {
    POSITION_TERMS.contains(&word)
}

/// Extracts position and domain terms from free text (a title or skill field).
///
/// When a connector word is followed by more text, everything after it forms a
/// single domain phrase. Otherwise every word that is neither a position term
/// nor a stop word is a domain term.
pub fn extract_terms(text: &str) -> TitleTerms {
    let words = tokenize(text);
    if words.is_empty() {
        return TitleTerms::default();
    }

    let position = dedup(
        words
            .iter()
            .filter(|w| is_position_term(w))
            .cloned()
            .collect(),
    );

    let connector_phrase = words
        .iter()
        .enumerate()
        .take(words.len() - 1)
        .find(|(_, w)| CONNECTORS.contains(&w.as_str()))
        .map(|(i, _)| words[i + 1..].join(" "));

    let domain = match connector_phrase {
        Some(phrase) => vec![phrase],
        None => dedup(
            words
                .iter()
                .filter(|w| !is_position_term(w) && !STOP_WORDS.contains(&w.as_str()))
                .cloned()
                .collect(),
        ),
    };

    TitleTerms { position, domain }
}

/// Terms for a job: position terms from the title, domain terms from the title
/// unioned (order-preserving, deduplicated) with those of the primary skill.
pub fn job_terms(job: &JobDescriptor) -> TitleTerms {
    let mut terms = extract_terms(&job.title);
    if let Some(skill) = job.primary_skill.as_deref() {
        let skill_terms = extract_terms(skill);
        terms.domain.extend(skill_terms.domain);
        terms.domain = dedup(std::mem::take(&mut terms.domain));
    }
    terms
}

fn dedup(words: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    words
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;

    fn job(title: &str, primary_skill: Option<&str>) -> JobDescriptor {
        JobDescriptor {
            id: 1,
            title: title.to_string(),
            description: String::new(),
            primary_skill: primary_skill.map(str::to_string),
            job_type: JobType::Technical,
        }
    }

    #[test]
    fn test_senior_data_engineer() {
        let terms = extract_terms("Senior Data Engineer");
        assert_eq!(terms.position, vec!["senior", "engineer"]);
        assert_eq!(terms.domain, vec!["data"]);
    }

    #[test]
    fn test_connector_phrase_becomes_domain() {
        let terms = extract_terms("Consultant en Data Science");
        assert_eq!(terms.position, vec!["consultant"]);
        assert_eq!(terms.domain, vec!["data science"]);

        let terms = extract_terms("Engineer in Machine Learning");
        assert_eq!(terms.domain, vec!["machine learning"]);
    }

    #[test]
    fn test_trailing_connector_is_ignored() {
        let terms = extract_terms("Expert en");
        assert_eq!(terms.position, vec!["expert"]);
        assert!(terms.domain.is_empty());
    }

    #[test]
    fn test_stop_words_dropped() {
        let terms = extract_terms("Chef de Projet");
        assert_eq!(terms.position, vec!["chef"]);
        assert_eq!(terms.domain, vec!["projet"]);
    }

    #[test]
    fn test_french_title_domain() {
        let terms = extract_terms("Ingénieur DevOps");
        assert_eq!(terms.position, vec!["ingénieur"]);
        assert_eq!(terms.domain, vec!["devops"]);
    }

    #[test]
    fn test_job_terms_unions_primary_skill() {
        let terms = job_terms(&job("Data Engineer", Some("Data, Spark")));
        assert_eq!(terms.domain, vec!["data", "spark"]);
        assert_eq!(terms.position, vec!["engineer"]);
    }

    #[test]
    fn test_empty_title() {
        assert_eq!(extract_terms("   "), TitleTerms::default());
    }
}
