use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::rank::{RankOptions, rank};
use crate::candidate::{Candidate, RawRecord, normalize};
use crate::embedding::{Embedder, EmbeddingError};
use crate::sources::{SourceAdapter, SourceId};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("could not rank results: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("query timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Records requested from each source.
    pub limit: usize,
    pub rank: RankOptions,
    /// Deadline for the whole query, fetch through ranking.
    pub timeout: Duration,
}

/// Queries every source concurrently and waits for all of them.
///
/// Output order follows `sources`. A failing source is logged and
/// contributes an empty list.
pub async fn fetch_all<S: SourceAdapter>(
    sources: &[S],
    query: &str,
    limit: usize,
) -> Vec<(SourceId, Vec<RawRecord>)> {
    let outcomes = join_all(sources.iter().map(|source| async move {
        let started = Instant::now();
        let outcome = source.fetch(query, limit).await;
        (source.id(), outcome, started.elapsed())
    }))
    .await;

    outcomes
        .into_iter()
        .map(|(id, outcome, elapsed)| match outcome {
            Ok(records) => {
                debug!(source = %id, count = records.len(), ?elapsed, "source returned results");
                (id, records)
            }
            Err(e) => {
                warn!(source = %id, error = %e, "source failed (continuing with other sources)");
                (id, Vec::new())
            }
        })
        .collect()
}

/// Normalizes and concatenates per-source results: sources in the given
/// order, records in response order. No cross-source deduplication.
pub fn aggregate(per_source: Vec<(SourceId, Vec<RawRecord>)>) -> Vec<Candidate> {
    per_source
        .into_iter()
        .flat_map(|(source, records)| {
            records
                .into_iter()
                .map(move |record| normalize(source, record))
        })
        .collect()
}

/// Runs one query end to end: fan out, aggregate, rank.
///
/// Hitting the deadline drops every in-flight request and returns
/// [`SearchError::Timeout`]; no partial result is produced.
pub async fn retrieve<S: SourceAdapter, E: Embedder>(
    sources: &[S],
    embedder: &E,
    req: &SearchRequest<'_>,
) -> Result<Vec<Candidate>, SearchError> {
    let pipeline = async {
        let per_source = fetch_all(sources, req.query, req.limit).await;
        let candidates = aggregate(per_source);
        info!(candidates = candidates.len(), "candidates aggregated");
        rank(embedder, req.query, candidates, req.rank).await
    };

    let ranked = tokio::time::timeout(req.timeout, pipeline)
        .await
        .map_err(|_| SearchError::Timeout(req.timeout))??;

    info!(results = ranked.len(), "query ranked");
    Ok(ranked)
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::embedding::testing::BagOfWords;
    use crate::search::format::{FormatRegistry, NO_RESULTS};
    use crate::sources::{EduplayClient, MedcredClient, Source};
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_json(server: &MockServer, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    fn sources(medcred_url: &str, eduplay_url: &str) -> Vec<Source> {
        let http = Client::new();
        vec![
            Source::Medcred(MedcredClient::new(http.clone(), medcred_url)),
            Source::Eduplay(EduplayClient::new(http, eduplay_url)),
        ]
    }

    fn request(query: &str) -> SearchRequest<'_> {
        SearchRequest {
            query,
            limit: 20,
            rank: RankOptions {
                top_k: 3,
                min_similarity: None,
            },
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn single_match_from_one_source() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/medcred",
            200,
            serde_json::json!([{"name": "Intro to Sets", "views": 10, "likes": 2}]),
        )
        .await;
        mount_json(&server, "/eduplay", 200, serde_json::json!([])).await;

        let sources = sources(
            &format!("{}/medcred", server.uri()),
            &format!("{}/eduplay", server.uri()),
        );
        let ranked = retrieve(&sources, &BagOfWords::default(), &request("Intro to Sets"))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].relevance().unwrap() > 0.999);

        let text = FormatRegistry::default().format(&ranked);
        assert_eq!(text.split("\n\n").count(), 1);
        assert!(text.contains("Intro to Sets"));
        assert!(text.contains("Views: 10 | Likes: 2"));
        assert!(text.contains("Relevance: 1.0000"), "got: {text}");
    }

    #[tokio::test]
    async fn all_sources_empty_reports_no_results() {
        let server = MockServer::start().await;
        mount_json(&server, "/medcred", 200, serde_json::json!({"results": []})).await;
        mount_json(&server, "/eduplay", 200, serde_json::json!({"contents": []})).await;

        let sources = sources(
            &format!("{}/medcred", server.uri()),
            &format!("{}/eduplay", server.uri()),
        );
        let embedder = BagOfWords::default();
        let ranked = retrieve(&sources, &embedder, &request("anything"))
            .await
            .unwrap();

        assert_eq!(FormatRegistry::default().format(&ranked), NO_RESULTS);
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn network_failure_in_one_source_keeps_the_other() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/eduplay",
            200,
            serde_json::json!({"contents": [{"title": "Conjuntos numéricos", "contentType": "video"}]}),
        )
        .await;

        // Nothing listens on port 1: connection refused.
        let sources = sources(
            "http://127.0.0.1:1/medcred",
            &format!("{}/eduplay", server.uri()),
        );
        let ranked = retrieve(&sources, &BagOfWords::default(), &request("conjuntos"))
            .await
            .unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].source(), SourceId::Eduplay);
        let text = FormatRegistry::default().format(&ranked);
        assert!(text.contains("Conjuntos numéricos"));
    }

    #[tokio::test]
    async fn http_error_in_one_source_keeps_the_other() {
        let server = MockServer::start().await;
        mount_json(&server, "/medcred", 503, serde_json::json!({"error": "down"})).await;
        mount_json(
            &server,
            "/eduplay",
            200,
            serde_json::json!({"contents": [{"title": "Sets"}]}),
        )
        .await;

        let sources = sources(
            &format!("{}/medcred", server.uri()),
            &format!("{}/eduplay", server.uri()),
        );
        let ranked = retrieve(&sources, &BagOfWords::default(), &request("sets"))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].source(), SourceId::Eduplay);
    }

    #[tokio::test]
    async fn slow_source_hits_query_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/medcred"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        mount_json(&server, "/eduplay", 200, serde_json::json!([])).await;

        let sources = sources(
            &format!("{}/medcred", server.uri()),
            &format!("{}/eduplay", server.uri()),
        );
        let req = SearchRequest {
            timeout: Duration::from_millis(200),
            ..request("q")
        };
        let err = retrieve(&sources, &BagOfWords::default(), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)));
    }

    #[tokio::test]
    async fn disabled_source_contributes_nothing() {
        let server = MockServer::start().await;
        mount_json(&server, "/medcred", 200, serde_json::json!([{"name": "sets"}])).await;

        let sources = vec![
            Source::Medcred(MedcredClient::new(
                Client::new(),
                &format!("{}/medcred", server.uri()),
            )),
            Source::Disabled(SourceId::Eduplay),
        ];
        let ranked = retrieve(&sources, &BagOfWords::default(), &request("sets"))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].source(), SourceId::Medcred);
    }
}
