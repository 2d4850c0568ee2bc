//! PageSpeed Insights client - the score aggregator.
//!
//! Issues one GET per audit category against the PageSpeed API, all four
//! concurrently with fail-fast semantics: the first non-success response
//! fails the whole aggregation and in-flight siblings are dropped.

use futures::future;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Production PageSpeed Insights endpoint.
pub const DEFAULT_PSI_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Audit strategy sent with every request.
const STRATEGY: &str = "mobile";

/// The four audited categories, in the fixed order they are fetched,
/// persisted, and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Performance,
    BestPractices,
    Accessibility,
    Seo,
}

impl Category {
    /// Fixed category order for fan-out and result alignment.
    pub const ALL: [Category; 4] = [
        Category::Performance,
        Category::BestPractices,
        Category::Accessibility,
        Category::Seo,
    ];

    /// The `category` query parameter value the API expects.
    pub fn as_api_param(self) -> &'static str {
        match self {
            Category::Performance => "PERFORMANCE",
            Category::BestPractices => "BEST_PRACTICES",
            Category::Accessibility => "ACCESSIBILITY",
            Category::Seo => "SEO",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_param())
    }
}

/// One score per category, scaled to [0, 100].
///
/// `None` means the upstream response omitted that category's score; it is
/// persisted as NULL and reported as JSON null rather than failing the audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSet {
    pub performance: Option<f64>,
    pub best_practices: Option<f64>,
    pub accessibility: Option<f64>,
    pub seo: Option<f64>,
}

/// Errors from the PageSpeed API.
#[derive(Debug, Error)]
pub enum PsiError {
    /// The API returned a non-success status for one category.
    #[error("PageSpeed request for {category} failed with status {status}")]
    UpstreamStatus { category: Category, status: u16 },

    /// Connection or body decoding failure.
    #[error("PageSpeed request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// =============================================================================
// Response shape
// =============================================================================

/// Subset of the PageSpeed response we consume.
#[derive(Debug, Deserialize)]
struct PsiResponse {
    #[serde(default, rename = "lighthouseResult")]
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: CategoryResults,
}

#[derive(Debug, Default, Deserialize)]
struct CategoryResults {
    #[serde(default)]
    performance: Option<CategoryResult>,
    #[serde(default, rename = "best-practices")]
    best_practices: Option<CategoryResult>,
    #[serde(default)]
    accessibility: Option<CategoryResult>,
    #[serde(default)]
    seo: Option<CategoryResult>,
}

#[derive(Debug, Deserialize)]
struct CategoryResult {
    #[serde(default)]
    score: Option<f64>,
}

impl CategoryResults {
    fn score_for(&self, category: Category) -> Option<f64> {
        let entry = match category {
            Category::Performance => &self.performance,
            Category::BestPractices => &self.best_practices,
            Category::Accessibility => &self.accessibility,
            Category::Seo => &self.seo,
        };
        entry.as_ref().and_then(|c| c.score)
    }
}

/// Scale a raw 0..1 score to 0..100.
fn scale_score(raw: f64) -> f64 {
    (raw * 100.0).round()
}

// =============================================================================
// Client
// =============================================================================

/// PageSpeed Insights API client.
///
/// Cheap to clone; the underlying reqwest client is shared.
#[derive(Clone)]
pub struct PsiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl PsiClient {
    /// Create a client for the given API key and endpoint base URL.
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
        }
    }

    /// Fetch all four category scores for a target URL concurrently.
    ///
    /// Fail-fast: the first category call that fails aborts the aggregation
    /// and no partial result is returned.
    pub async fn fetch_scores(&self, url: &str) -> Result<ScoreSet, PsiError> {
        let scores = future::try_join_all(
            Category::ALL
                .iter()
                .map(|category| self.fetch_category(url, *category)),
        )
        .await?;

        Ok(ScoreSet {
            performance: scores[0],
            best_practices: scores[1],
            accessibility: scores[2],
            seo: scores[3],
        })
    }

    /// Fetch one category's score for a target URL.
    async fn fetch_category(
        &self,
        url: &str,
        category: Category,
    ) -> Result<Option<f64>, PsiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", url),
                ("key", self.api_key.as_str()),
                ("strategy", STRATEGY),
                ("category", category.as_api_param()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PsiError::UpstreamStatus {
                category,
                status: status.as_u16(),
            });
        }

        let payload: PsiResponse = response.json().await?;
        let score = payload
            .lighthouse_result
            .categories
            .score_for(category)
            .map(scale_score);

        info!(
            category = %category,
            score = ?score,
            "psi_fetch_complete"
        );

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(body: &str) -> PsiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_score_extraction_and_scaling() {
        let response = parse(
            r#"{"lighthouseResult":{"categories":{"performance":{"score":0.91}}}}"#,
        );
        let score = response
            .lighthouse_result
            .categories
            .score_for(Category::Performance)
            .map(scale_score);
        assert_eq!(score, Some(91.0));
    }

    #[test]
    fn test_hyphenated_best_practices_key() {
        let response = parse(
            r#"{"lighthouseResult":{"categories":{"best-practices":{"score":0.77}}}}"#,
        );
        let score = response
            .lighthouse_result
            .categories
            .score_for(Category::BestPractices)
            .map(scale_score);
        assert_eq!(score, Some(77.0));
    }

    #[test]
    fn test_missing_score_field_is_none() {
        let response = parse(r#"{"lighthouseResult":{"categories":{"seo":{}}}}"#);
        assert_eq!(
            response.lighthouse_result.categories.score_for(Category::Seo),
            None
        );

        let empty = parse(r#"{}"#);
        assert_eq!(
            empty
                .lighthouse_result
                .categories
                .score_for(Category::Performance),
            None
        );
    }

    #[test]
    fn test_category_order_matches_api_params() {
        let params: Vec<&str> = Category::ALL.iter().map(|c| c.as_api_param()).collect();
        assert_eq!(
            params,
            vec!["PERFORMANCE", "BEST_PRACTICES", "ACCESSIBILITY", "SEO"]
        );
    }

    #[tokio::test]
    async fn test_fetch_scores_concurrent_success() {
        let server = MockServer::start().await;
        for (category, score) in [
            ("PERFORMANCE", 0.91),
            ("BEST_PRACTICES", 0.85),
            ("ACCESSIBILITY", 1.0),
            ("SEO", 0.77),
        ] {
            let key = match category {
                "PERFORMANCE" => "performance",
                "BEST_PRACTICES" => "best-practices",
                "ACCESSIBILITY" => "accessibility",
                _ => "seo",
            };
            Mock::given(method("GET"))
                .and(path("/runPagespeed"))
                .and(query_param("category", category))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "lighthouseResult": { "categories": { key: { "score": score } } }
                })))
                .mount(&server)
                .await;
        }

        let client = PsiClient::new(
            "test-key".to_string(),
            format!("{}/runPagespeed", server.uri()),
        );
        let scores = client.fetch_scores("https://example.com").await.unwrap();

        assert_eq!(scores.performance, Some(91.0));
        assert_eq!(scores.best_practices, Some(85.0));
        assert_eq!(scores.accessibility, Some(100.0));
        assert_eq!(scores.seo, Some(77.0));
    }

    #[tokio::test]
    async fn test_fetch_scores_fails_fast_on_upstream_error() {
        let server = MockServer::start().await;
        for category in ["PERFORMANCE", "BEST_PRACTICES", "ACCESSIBILITY"] {
            Mock::given(method("GET"))
                .and(path("/runPagespeed"))
                .and(query_param("category", category))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "lighthouseResult": { "categories": {} }
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/runPagespeed"))
            .and(query_param("category", "SEO"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = PsiClient::new(
            "test-key".to_string(),
            format!("{}/runPagespeed", server.uri()),
        );
        let err = client.fetch_scores("https://example.com").await.unwrap_err();

        match err {
            PsiError::UpstreamStatus { category, status } => {
                assert_eq!(category, Category::Seo);
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
