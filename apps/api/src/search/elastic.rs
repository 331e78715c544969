//! Elasticsearch backend. Translates the relevance query descriptor into the
//! query DSL, with `nested` wrappers (max score mode) for repeated sub-entities.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::search::document::CandidateDocument;
use crate::search::query::{Clause, ClauseKind, Field, RelevanceQuery};
use crate::search::{SearchEngine, SearchError, SearchHit};

const LOWERCASE_NORMALIZER: &str = "lowercase_normalizer";

pub struct ElasticsearchEngine {
    client: Client,
    base_url: String,
    index: String,
    auth: Option<(String, Option<String>)>,
    retry: RetryPolicy,
}

impl ElasticsearchEngine {
    pub fn new(
        base_url: &str,
        index: &str,
        username: Option<String>,
        password: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            auth: username.map(|u| (u, password)),
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.index, path)
    }

    /// Sends one request, retrying transport errors, 429 and 5xx per the retry policy.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, SearchError> {
        let url = self.url(path);
        let mut last_error: Option<SearchError> = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                warn!("Search request to {url} failed, retry {attempt}");
            }
            self.retry.wait(attempt).await;

            let mut request = self.client.request(method.clone(), &url);
            if let Some((user, password)) = &self.auth {
                request = request.basic_auth(user, password.as_ref());
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(SearchError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(SearchError::Backend {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| SearchError::Unavailable(url)))
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchEngine {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        let status = self.send(Method::HEAD, "", None).await?.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message: format!("unexpected status checking index '{}'", self.index),
            });
        }

        let response = self.send(Method::PUT, "", Some(&index_definition())).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend { status, message });
        }
        info!("Created search index '{}'", self.index);
        Ok(())
    }

    async fn query(&self, query: &RelevanceQuery) -> Result<Vec<SearchHit>, SearchError> {
        let body = to_search_body(query);
        let response = self.send(Method::POST, "/_search", Some(&body)).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SearchError::Unavailable(format!(
                "index '{}' does not exist",
                self.index
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let hits = parse_hits(&text)?;
        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn index_candidate(&self, document: &CandidateDocument) -> Result<(), SearchError> {
        let body = serde_json::to_value(document)?;
        let path = format!("/_doc/{}?refresh=true", document.id);
        let response = self.send(Method::PUT, &path, Some(&body)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend { status, message });
        }
        Ok(())
    }

    async fn document_count(&self) -> Result<u64, SearchError> {
        let response = self.send(Method::GET, "/_count", None).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        parse_count(&response.text().await?)
    }
}

// ── Query DSL translation ─────────────────────────────────────────────────────

pub fn to_search_body(query: &RelevanceQuery) -> Value {
    let mut bool_query = json!({
        "should": query.should.iter().map(|c| clause_dsl(c, Some(c.boost))).collect::<Vec<_>>(),
        "minimum_should_match": 1,
        "must_not": query.must_not.iter().map(|c| clause_dsl(c, None)).collect::<Vec<_>>(),
    });
    if let Some(ids) = &query.restrict_to {
        bool_query["filter"] = json!([{ "ids": { "values": ids.iter().map(|id| id.to_string()).collect::<Vec<_>>() } }]);
    }

    json!({
        "size": query.size,
        "query": { "bool": bool_query },
    })
}

fn field_path(field: Field) -> &'static str {
    match field {
        Field::CurrentTitle => "job_title",
        Field::HardSkills => "hard_skills.name",
        Field::ExperienceTitle => "experiences.job_title",
        Field::ExperienceResponsibilities => "experiences.responsibilities",
    }
}

fn nested_path(field: Field) -> Option<&'static str> {
    match field {
        Field::HardSkills => Some("hard_skills"),
        Field::ExperienceTitle | Field::ExperienceResponsibilities => Some("experiences"),
        Field::CurrentTitle => None,
    }
}

/// Wraps a query on a nested field so the best-matching entry sets the score.
fn wrap_nested(field: Field, inner: Value) -> Value {
    match nested_path(field) {
        Some(path) => json!({
            "nested": { "path": path, "query": inner, "score_mode": "max" }
        }),
        None => inner,
    }
}

fn match_dsl(field: Field, text: &str, minimum_should_match: Option<u8>, boost: Option<f64>) -> Value {
    let mut params = json!({ "query": text, "operator": "or" });
    if let Some(m) = minimum_should_match {
        params["minimum_should_match"] = json!(format!("{m}%"));
    }
    if let Some(b) = boost {
        params["boost"] = json!(b);
    }
    wrap_nested(field, json!({ "match": { field_path(field): params } }))
}

fn clause_dsl(clause: &Clause, boost: Option<f64>) -> Value {
    match &clause.kind {
        ClauseKind::Phrase { field, text } => {
            let mut params = json!({ "query": text });
            if let Some(b) = boost {
                params["boost"] = json!(b);
            }
            wrap_nested(*field, json!({ "match_phrase": { field_path(*field): params } }))
        }
        ClauseKind::Match {
            field,
            terms,
            minimum_should_match,
        } => match_dsl(*field, &terms.join(" "), *minimum_should_match, boost),
        ClauseKind::MultiMatch {
            text,
            fields,
            minimum_should_match,
        } => {
            let queries: Vec<Value> = fields
                .iter()
                .map(|(field, field_boost)| match_dsl(*field, text, *minimum_should_match, Some(*field_boost)))
                .collect();
            let mut dis_max = json!({ "queries": queries });
            if let Some(b) = boost {
                dis_max["boost"] = json!(b);
            }
            json!({ "dis_max": dis_max })
        }
        ClauseKind::Terms { field, terms } => {
            let keyword_path = format!("{}.keyword", field_path(*field));
            let values: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
            let mut params = json!({ keyword_path: values });
            if let Some(b) = boost {
                params["boost"] = json!(b);
            }
            wrap_nested(*field, json!({ "terms": params }))
        }
    }
}

// ── Index definition and response parsing ─────────────────────────────────────

pub fn index_definition() -> Value {
    json!({
        "settings": {
            "analysis": {
                "normalizer": {
                    LOWERCASE_NORMALIZER: { "type": "custom", "filter": ["lowercase", "asciifolding"] }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "text" },
                "email": { "type": "keyword" },
                "job_title": { "type": "text" },
                "hard_skills": {
                    "type": "nested",
                    "properties": {
                        "name": {
                            "type": "text",
                            "fields": {
                                "keyword": { "type": "keyword", "normalizer": LOWERCASE_NORMALIZER }
                            }
                        }
                    }
                },
                "experiences": {
                    "type": "nested",
                    "properties": {
                        "job_title": { "type": "text" },
                        "company": { "type": "text" },
                        "duration": { "type": "keyword" },
                        "responsibilities": { "type": "text" }
                    }
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: CandidateDocument,
}

fn parse_hits(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|h| SearchHit {
            id: h.source.id,
            score: h.score.unwrap_or(0.0),
            document: h.source,
        })
        .collect())
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

fn parse_count(body: &str) -> Result<u64, SearchError> {
    let response: CountResponse = serde_json::from_str(body)?;
    Ok(response.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobDescriptor, JobType};
    use crate::search::query::build_relevance_query;
    use crate::search::terms::job_terms;

    fn devops_query() -> RelevanceQuery {
        let job = JobDescriptor {
            id: 1,
            title: "Ingénieur DevOps".to_string(),
            description: String::new(),
            primary_skill: Some("Kubernetes".to_string()),
            job_type: JobType::Technical,
        };
        build_relevance_query(&job, &job_terms(&job), 10)
    }

    #[test]
    fn test_body_has_all_clauses_and_exclusion() {
        let body = to_search_body(&devops_query());
        assert_eq!(body["size"], 10);
        assert_eq!(body["query"]["bool"]["should"].as_array().unwrap().len(), 7);
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        let must_not = &body["query"]["bool"]["must_not"][0]["match"]["job_title"];
        assert!(must_not["query"].as_str().unwrap().contains("stagiaire"));
        assert!(must_not.get("boost").is_none());
    }

    #[test]
    fn test_nested_fields_use_max_score_mode() {
        let body = to_search_body(&devops_query());
        let experience = &body["query"]["bool"]["should"][2];
        assert_eq!(experience["nested"]["path"], "experiences");
        assert_eq!(experience["nested"]["score_mode"], "max");
        assert_eq!(
            experience["nested"]["query"]["match"]["experiences.job_title"]["minimum_should_match"],
            "30%"
        );
    }

    #[test]
    fn test_primary_skill_is_dis_max_over_title_and_skills() {
        let body = to_search_body(&devops_query());
        let skill = &body["query"]["bool"]["should"][3]["dis_max"];
        assert_eq!(skill["boost"], 2.5);
        assert_eq!(skill["queries"][0]["match"]["job_title"]["boost"], 1.5);
        assert_eq!(
            skill["queries"][1]["nested"]["query"]["match"]["hard_skills.name"]["boost"],
            2.0
        );
    }

    #[test]
    fn test_exact_skill_terms_use_keyword_subfield() {
        let body = to_search_body(&devops_query());
        let terms = &body["query"]["bool"]["should"][4]["nested"]["query"]["terms"];
        assert_eq!(terms["hard_skills.name.keyword"], json!(["devops", "kubernetes"]));
        assert_eq!(terms["boost"], 2.0);
    }

    #[test]
    fn test_restricted_query_adds_ids_filter() {
        let body = to_search_body(&devops_query().restricted_to(vec![7]));
        assert_eq!(body["query"]["bool"]["filter"][0]["ids"]["values"], json!(["7"]));
    }

    #[test]
    fn test_parse_hits_reads_source_and_score() {
        let body = r#"{"hits":{"total":{"value":1},"hits":[
            {"_id":"7","_score":6.4,"_source":{"id":7,"name":"A","job_title":"DevOps Engineer"}}
        ]}}"#;
        let hits = parse_hits(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 7);
        assert!((hits[0].score - 6.4).abs() < 1e-9);
        assert_eq!(hits[0].document.job_title.as_deref(), Some("DevOps Engineer"));
    }

    #[test]
    fn test_parse_count() {
        let body = r#"{"count":42,"_shards":{"total":1,"successful":1,"skipped":0,"failed":0}}"#;
        assert_eq!(parse_count(body).unwrap(), 42);
        assert!(parse_count(r#"{"error":"boom"}"#).is_err());
    }

    #[test]
    fn test_mapping_declares_nested_entities() {
        let mapping = index_definition();
        assert_eq!(mapping["mappings"]["properties"]["hard_skills"]["type"], "nested");
        assert_eq!(mapping["mappings"]["properties"]["experiences"]["type"], "nested");
    }
}
