use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use schematic_gen::constants::{APP_TITLE, APP_URL};
use schematic_gen::{
    generate_to_file, GeneratorConfig, SchematicError, SchematicGenerator, SchematicPipeline,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Upstream {
    reviews: Arc<AtomicUsize>,
    image_prompts: Arc<Mutex<Vec<String>>>,
    review_bodies: Arc<Mutex<Vec<Value>>>,
    attribution: Arc<Mutex<Vec<(String, String)>>>,
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// "hello" in base64.
const IMAGE_B64: &str = "aGVsbG8=";

async fn chat_completions(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    upstream.attribution.lock().unwrap().push((
        header_value(&headers, "x-title"),
        header_value(&headers, "http-referer"),
    ));
    if body.get("modalities").is_some() {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
        upstream.image_prompts.lock().unwrap().push(prompt);
        return Json(json!({
            "id": "gen-image",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Here is your schematic.",
                    "images": [{
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{IMAGE_B64}") }
                    }]
                }
            }]
        }));
    }

    upstream.review_bodies.lock().unwrap().push(body);
    let review = match upstream.reviews.fetch_add(1, Ordering::SeqCst) {
        0 => "SCORE: 5/10\nVERDICT: REVISE\nCRITIQUE: Add more spacing between boxes",
        _ => "SCORE: 9/10\nVERDICT: ACCEPT\nCRITIQUE: None",
    };
    Json(json!({
        "id": "gen-review",
        "choices": [{ "message": { "role": "assistant", "content": review } }]
    }))
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

async fn serve(router: Router) -> String {
    let (listener, base) = bind().await;
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("{base}/api/v1")
}

fn config(endpoint: String) -> GeneratorConfig {
    GeneratorConfig::new("test_key")
        .unwrap()
        .with_endpoint(endpoint)
        .with_image_model("test/image")
        .with_review_model("test/review")
}

#[tokio::test]
async fn refines_until_review_accepts_and_writes_artifacts() {
    let upstream = Upstream::default();
    let router = Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .with_state(upstream.clone());
    let endpoint = serve(router).await;

    let generator = SchematicGenerator::new(config(endpoint)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("flowchart.png");

    let (outcome, written) = generate_to_file(
        &generator,
        generator.config(),
        "Create a flowchart",
        3,
        &output,
    )
    .await
    .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.image.bytes, b"hello");
    assert_eq!(outcome.image.mime_type, "image/png");
    assert_eq!(outcome.image.model_text.as_deref(), Some("Here is your schematic."));

    let prompts = upstream.image_prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Create a flowchart"));
    assert!(!prompts[0].contains("ITERATION"));
    assert!(prompts[1].contains("ITERATION 2"));
    assert!(prompts[1].contains("Add more spacing between boxes"));

    let reviews = upstream.review_bodies.lock().unwrap().clone();
    assert_eq!(reviews[0]["model"], "test/review");
    assert_eq!(
        reviews[0]["messages"][0]["content"][1]["image_url"]["url"],
        format!("data:image/png;base64,{IMAGE_B64}")
    );

    assert_eq!(std::fs::read(&output).unwrap(), b"hello");
    assert!(dir.path().join("flowchart_v1.png").exists());
    assert!(dir.path().join("flowchart_v2.png").exists());
    let log: Value =
        serde_json::from_str(&std::fs::read_to_string(&written.review_log).unwrap()).unwrap();
    assert_eq!(log["accepted"], true);
    assert_eq!(log["history"][0]["review"]["score"], 5.0);
    assert_eq!(log["history"][1]["imageFile"], "flowchart_v2.png");

    let attribution = upstream.attribution.lock().unwrap().clone();
    assert_eq!(attribution.len(), 4);
    for (title, referer) in attribution {
        assert_eq!(title, APP_TITLE);
        assert_eq!(referer, APP_URL);
    }
}

#[tokio::test]
async fn budget_of_one_returns_unaccepted_image() {
    let upstream = Upstream::default();
    let router = Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .with_state(upstream.clone());
    let endpoint = serve(router).await;

    let generator = SchematicGenerator::new(config(endpoint)).unwrap();
    let outcome = generator
        .generate_iterative("Create a flowchart", 1)
        .await
        .unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.history[0].review.critique, "Add more spacing between boxes");
    assert_eq!(upstream.image_prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn upstream_failure_surfaces_as_upstream_error() {
    let router = Router::new().route(
        "/api/v1/chat/completions",
        post(|| async { (StatusCode::PAYMENT_REQUIRED, "insufficient credits") }),
    );
    let endpoint = serve(router).await;

    let generator = SchematicGenerator::new(config(endpoint)).unwrap();
    let err = generator
        .generate_iterative("Create a flowchart", 3)
        .await
        .unwrap_err();

    match err {
        SchematicError::Upstream(message) => {
            assert!(message.contains("402"), "{message}");
            assert!(message.contains("insufficient credits"), "{message}");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_remote_image_surfaces_as_upstream_error() {
    let (listener, base) = bind().await;
    let image_url = format!("{base}/files/schematic.png");
    let router = Router::new()
        .route(
            "/files/schematic.png",
            get(|| async { (StatusCode::NOT_FOUND, "expired") }),
        )
        .route(
            "/api/v1/chat/completions",
            post(move || {
                let url = image_url.clone();
                async move {
                    Json(json!({
                        "id": "gen-image",
                        "choices": [{
                            "message": {
                                "role": "assistant",
                                "images": [{ "type": "image_url", "image_url": { "url": url } }]
                            }
                        }]
                    }))
                }
            }),
        );
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let generator = SchematicGenerator::new(config(format!("{base}/api/v1"))).unwrap();
    let err = generator
        .generate_iterative("Create a flowchart", 2)
        .await
        .unwrap_err();

    match err {
        SchematicError::Upstream(message) => {
            assert!(message.contains("image generation request failed"), "{message}");
            assert!(message.contains("404"), "{message}");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}
