//! The process-wide config is shared by every test in this binary, so all
//! assertions about it live in one test.

use autoevals::{
    ClientHandle, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL, DefaultModel, EmbeddingSimilarity,
    InitOptions, LlmClassifier, Scorer, ScorerArgs, current_config, init,
};
use autoevals_model::MockClient;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_init_lifecycle() {
    let mock = Arc::new(
        MockClient::new("global")
            .with_tool_call("select_choice", json!({"reasons": "ok", "choice": "Y"}))
            .with_embedding("a", vec![1.0, 0.0])
            .with_embedding("b", vec![1.0, 0.0]),
    );

    // Structured form updates only what it names.
    init(InitOptions::new().with_client(ClientHandle::new(mock.clone())).with_default_model(DefaultModel::Models {
        completion: Some("claude-3-5-sonnet".into()),
        embedding: Some("embed-1".into()),
    }));
    init(
        InitOptions::new()
            .with_client(ClientHandle::new(mock.clone()))
            .with_default_model(DefaultModel::completion("gpt-4o-mini")),
    );
    let config = current_config();
    assert_eq!(config.default_completion_model(), "gpt-4o-mini");
    assert_eq!(config.default_embedding_model(), "embed-1");
    assert_eq!(config.client().map(|c| c.client().name()), Some("global"));

    // Scorers without an explicit client or config use the global ones.
    let scorer = LlmClassifier::builder(
        "Yes",
        "Is {{output}} fine?",
        [("Y".to_string(), 1.0), ("N".to_string(), 0.0)].into_iter().collect(),
    )
    .build()
    .unwrap();
    let score = scorer.score(ScorerArgs::new("x")).await.unwrap();
    assert_eq!(score.score, Some(1.0));
    assert_eq!(mock.completion_requests()[0].model, "gpt-4o-mini");

    let similarity = EmbeddingSimilarity::new().eval(json!("a"), json!("b")).await.unwrap();
    assert_eq!(similarity.score, Some(1.0));
    assert_eq!(mock.embedding_requests()[0].model, "embed-1");

    // Legacy form sets completion and resets embedding.
    init(InitOptions::new().with_default_model("gpt-4.1"));
    let config = current_config();
    assert_eq!(config.default_completion_model(), "gpt-4.1");
    assert_eq!(config.default_embedding_model(), DEFAULT_EMBEDDING_MODEL);
    assert!(config.client().is_none());

    // No arguments restores both built-ins.
    init(InitOptions::new().with_default_model(DefaultModel::embedding("embed-2")));
    init(InitOptions::new());
    let config = current_config();
    assert_eq!(config.default_completion_model(), DEFAULT_COMPLETION_MODEL);
    assert_eq!(config.default_embedding_model(), DEFAULT_EMBEDDING_MODEL);
}
