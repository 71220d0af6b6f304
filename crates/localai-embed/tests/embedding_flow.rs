use std::time::Duration;

use localai_embed::{EmbeddingClient, EmbeddingConfig, Embeddings, ProviderError};
use mockito::{Matcher, Server};
use serde_json::json;

fn config(base: &str) -> EmbeddingConfig {
    let mut cfg = EmbeddingConfig::new(base);
    cfg.api_key = Some("random-string".to_string());
    cfg.model = "bert-cpp-minilm-v6".to_string();
    cfg.max_retries = 0;
    cfg.timeout = Duration::from_secs(5);
    cfg
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[test]
fn embed_documents_blocking_returns_one_vector_per_text() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", "Bearer random-string")
        .match_body(Matcher::Json(json!({
            "model": "bert-cpp-minilm-v6",
            "input": ["foo", "bar", "baz"],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "model": "bert-cpp-minilm-v6",
                "data": [
                    {"object": "embedding", "index": 0, "embedding": [0.1, 0.2]},
                    {"object": "embedding", "index": 1, "embedding": [0.3, 0.4]},
                    {"object": "embedding", "index": 2, "embedding": [0.5, 0.6]},
                ],
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let embeddings = EmbeddingClient::new(config(&server.url())).expect("client");
    let input = texts(&["foo", "bar", "baz"]);
    let vectors = embeddings
        .embed_documents_blocking(&input)
        .expect("embed");

    assert_eq!(vectors.len(), input.len());
    assert_eq!(vectors[0], vec![0.1_f32, 0.2]);
    assert_eq!(vectors[2], vec![0.5_f32, 0.6]);
    mock.assert();
}

#[tokio::test]
async fn embed_query_matches_first_batch_vector() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": ["what is localai?"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"index":0,"embedding":[1.5,-2.0,0.25]}]}"#)
        .expect(2)
        .create_async()
        .await;

    let embeddings = EmbeddingClient::new(config(&server.url())).expect("client");
    let query = embeddings
        .embed_query("what is localai?")
        .await
        .expect("query");
    let batch = embeddings
        .embed_documents(&texts(&["what is localai?"]))
        .await
        .expect("batch");

    assert_eq!(query, batch[0]);
    assert_eq!(query, vec![1.5_f32, -2.0, 0.25]);
    mock.assert_async().await;
    embeddings.close().await;
    embeddings.close().await;
}

#[test]
fn blocking_and_async_variants_agree() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"index":0,"embedding":[0.5,0.5]}]}"#)
        .expect(2)
        .create();

    let embeddings = EmbeddingClient::new(config(&server.url())).expect("client");
    let blocking = embeddings.embed_query_blocking("same").expect("blocking");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let awaited = runtime
        .block_on(embeddings.embed_query("same"))
        .expect("async");

    assert_eq!(blocking, awaited);
}

#[test]
fn model_kwargs_are_passed_through() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_body(Matcher::Json(json!({
            "model": "bert-cpp-minilm-v6",
            "input": ["x"],
            "dimensions": 2,
            "user": "tester",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"index":0,"embedding":[0.0,1.0]}]}"#)
        .expect(1)
        .create();

    let mut cfg = config(&server.url());
    cfg.model_kwargs.insert("dimensions".to_string(), json!(2));
    cfg.model_kwargs.insert("user".to_string(), json!("tester"));
    let embeddings = EmbeddingClient::new(cfg).expect("client");
    embeddings.embed_query_blocking("x").expect("embed");
    mock.assert();
}

#[test]
fn server_errors_propagate_unmodified() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(404)
        .with_body(r#"{"error":{"message":"model not found"}}"#)
        .expect(1)
        .create();

    let embeddings = EmbeddingClient::new(config(&server.url())).expect("client");
    let err = embeddings
        .embed_documents_blocking(&texts(&["a"]))
        .expect_err("404");
    match err {
        ProviderError::Api { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("model not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
    mock.assert();
}

#[test]
fn malformed_payload_is_an_error() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"unexpected":true}"#)
        .create();

    let embeddings = EmbeddingClient::new(config(&server.url())).expect("client");
    let err = embeddings
        .embed_documents_blocking(&texts(&["a"]))
        .expect_err("malformed");
    assert!(matches!(err, ProviderError::Serde(_)));
}

#[test]
fn transient_failures_are_retried_up_to_max_retries() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(503)
        .with_body("loading model")
        .expect(2)
        .create();

    let mut cfg = config(&server.url());
    cfg.max_retries = 1;
    let embeddings = EmbeddingClient::new(cfg).expect("client");
    let err = embeddings
        .embed_documents_blocking(&texts(&["a"]))
        .expect_err("503");
    assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    mock.assert();
}

#[tokio::test]
async fn embedding_succeeds_once_the_model_has_loaded() {
    let mut server = Server::new_async().await;
    let loading = server
        .mock("POST", "/v1/embeddings")
        .with_status(503)
        .with_body("loading model")
        .expect(1)
        .create_async()
        .await;
    let ready = server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
        .expect(1)
        .create_async()
        .await;

    let mut cfg = config(&server.url());
    cfg.max_retries = 1;
    let embeddings = EmbeddingClient::new(cfg).expect("client");
    let vector = embeddings.embed_query("a").await.expect("retry succeeds");
    assert_eq!(vector, vec![1.0_f32]);
    loading.assert_async().await;
    ready.assert_async().await;
}

#[test]
fn anonymous_client_sends_no_authorization() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"embedding":[1.0]}]}"#)
        .expect(1)
        .create();

    let mut cfg = config(&server.url());
    cfg.api_key = None;
    let embeddings = EmbeddingClient::new(cfg).expect("client");
    assert_eq!(embeddings.embed_query_blocking("x").expect("embed"), vec![1.0_f32]);
    mock.assert();
}
