//! The local web server: candidate browsing, direct downloads and remote approval runs.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::{Mutex, RwLock};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::decision::ApprovalQueue;
use crate::fetcher::FetchConfig;
use crate::progress::ProgressStore;
use crate::retrieve::HttpRetriever;
use crate::sources::HttpSources;
use crate::storage::ImageStore;

mod api;
pub mod runs;

use api::{
    answer_approval_handler, candidates_handler, categories_handler, download_handler,
    pending_approval_handler, progress_handler, run_status_handler, start_run_handler,
};
use runs::RunStatus;

/// Everything the handlers share.
#[derive(Clone, Debug)]
pub struct AppState {
    catalog: Catalog,
    store: ImageStore,
    sources: HttpSources,
    retriever: HttpRetriever,
    config: FetchConfig,
    progress: Arc<ProgressStore>,
    approvals: Arc<ApprovalQueue>,
    runs: Arc<RwLock<RunStatus>>,
    /// Held around every quota check plus save, by direct downloads and runs alike
    save_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Wires up the shared state.
    pub fn new(
        catalog: Catalog,
        store: ImageStore,
        sources: HttpSources,
        retriever: HttpRetriever,
        config: FetchConfig,
        progress: ProgressStore,
    ) -> Self {
        Self {
            catalog,
            store,
            sources,
            retriever,
            config,
            progress: Arc::new(progress),
            approvals: Arc::new(ApprovalQueue::default()),
            runs: Arc::new(RwLock::new(RunStatus::default())),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The approval queue remote runs park their questions on.
    pub fn approvals(&self) -> Arc<ApprovalQueue> {
        self.approvals.clone()
    }
}

fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(categories_handler))
        .route("/api/candidates/{image_type}", get(candidates_handler))
        .route("/api/download-image", post(download_handler))
        .route("/api/progress", get(progress_handler))
        .route("/api/runs", get(run_status_handler).post(start_run_handler))
        .route(
            "/api/approval",
            get(pending_approval_handler).post(answer_approval_handler),
        )
        .nest_service("/images", ServeDir::new(state.store.base()))
}

async fn shutdown_signal(approvals: Arc<ApprovalQueue>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", err);
        return;
    }
    info!("Shutting down");
    approvals.cancel();
}

/// Serves the API until ctrl-c.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let approvals = state.approvals();
    let app = create_router(&state).with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(approvals))
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Json;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
    use base64::Engine;
    use base64::engine::general_purpose;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::normalize::tests::sample_png;
    use crate::sources::{GeneratorSource, SearchSource};

    fn data_url() -> String {
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(sample_png())
        )
    }

    /// A stand-in search API answering in the Unsplash shape with inline images.
    async fn fake_search() -> String {
        let body = json!({
            "results": (1..=3).map(|n| json!({
                "urls": { "regular": data_url() },
                "description": format!("dog {n}"),
                "user": { "name": "Jane" },
            })).collect::<Vec<_>>()
        });
        let app = Router::new().route(
            "/search",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/search")
    }

    async fn setup_state(dir: &TempDir, target: u32) -> AppState {
        let endpoint = fake_search().await;
        let client = reqwest::Client::new();
        let sources = HttpSources::with_sources(
            SearchSource::unsplash(client.clone()).with_endpoint(&endpoint),
            SearchSource::lexica(client.clone()).with_endpoint(&endpoint),
            GeneratorSource::new("none", "http://127.0.0.1:9/", Vec::new()),
        );
        let catalog = Catalog::default();
        let progress = ProgressStore::open(dir.path().join("progress.json"), &catalog)
            .await
            .expect("progress");
        let config = FetchConfig {
            target_count: target,
            download_delay: std::time::Duration::ZERO,
            ..FetchConfig::default()
        };
        AppState::new(
            catalog,
            ImageStore::new(dir.path().join("images")),
            sources,
            HttpRetriever::with_client(client),
            config,
            progress,
        )
    }

    fn app(state: &AppState) -> Router {
        create_router(state).with_state(state.clone())
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn categories_lists_the_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 6).await;
        let response = app(&state)
            .oneshot(get_request("/api/categories"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["categories"].as_array().map(Vec::len), Some(20));
        assert_eq!(body["image_types"], json!(["real", "ai"]));
    }

    #[tokio::test]
    async fn candidates_come_from_the_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 6).await;

        let response = app(&state)
            .oneshot(get_request("/api/candidates/real?category=dogs&count=2"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["images"][0]["description"], "dog 1");
        assert_eq!(body["images"][0]["author"], "Jane");

        let response = app(&state)
            .oneshot(get_request("/api/candidates/real?category=lizards"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(&state)
            .oneshot(get_request("/api/candidates/sketch?category=dogs"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_saves_until_quota() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 2).await;
        let request = json!({
            "candidate": { "url": data_url(), "description": "a dog" },
            "category": "dogs",
            "image_type": "real",
        });

        for expected in 1..=2 {
            let response = app(&state)
                .oneshot(post_json("/api/download-image", request.clone()))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            let body = read_json(response).await;
            assert_eq!(body["filename"], format!("real_dogs_{expected}.jpg"));
            assert_eq!(body["count"], expected);
        }

        let response = app(&state)
            .oneshot(post_json("/api/download-image", request))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app(&state)
            .oneshot(get_request("/api/progress"))
            .await
            .expect("response");
        let body = read_json(response).await;
        assert_eq!(body["real"]["dogs"], 2);

        let response = app(&state)
            .oneshot(get_request("/images/dogs/real/real_dogs_1.jpg"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn download_rejects_bad_input_and_bad_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 6).await;

        let response = app(&state)
            .oneshot(post_json(
                "/api/download-image",
                json!({ "candidate": {}, "category": "dogs", "image_type": "real" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(&state)
            .oneshot(post_json(
                "/api/download-image",
                json!({
                    "candidate": { "url": data_url() },
                    "category": "lizards",
                    "image_type": "real",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let not_an_image = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(b"This is not an image file.")
        );
        let response = app(&state)
            .oneshot(post_json(
                "/api/download-image",
                json!({
                    "candidate": { "url": not_an_image },
                    "category": "dogs",
                    "image_type": "real",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let count = state
            .store
            .count_existing(
                &state.catalog.category("dogs").expect("dogs"),
                &state.catalog.image_type("real").expect("real"),
            )
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn approval_endpoints_without_a_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 6).await;

        let response = app(&state)
            .oneshot(get_request("/api/approval"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app(&state)
            .oneshot(post_json("/api/approval", json!({ "decision": "approve" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn wait_for_pending(state: &AppState) -> Value {
        loop {
            let response = app(state)
                .oneshot(get_request("/api/approval"))
                .await
                .expect("response");
            if response.status() == StatusCode::OK {
                return read_json(response).await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn remote_run_is_driven_by_approvals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 1).await;

        let response = app(&state)
            .oneshot(post_json(
                "/api/runs",
                json!({ "categories": ["dogs"], "image_types": ["real"] }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(read_json(response).await["state"], "running");

        let response = app(&state)
            .oneshot(post_json("/api/runs", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let pending = wait_for_pending(&state).await;
        assert_eq!(pending["ordinal"], 1);
        assert_eq!(pending["category"], "dogs");
        let response = app(&state)
            .oneshot(post_json("/api/approval", json!({ "decision": "reject" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let pending = wait_for_pending(&state).await;
        assert_eq!(pending["ordinal"], 2);
        let response = app(&state)
            .oneshot(post_json("/api/approval", json!({ "decision": "approve" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let status = loop {
            let response = app(&state)
                .oneshot(get_request("/api/runs"))
                .await
                .expect("response");
            let status = read_json(response).await;
            if status["state"] == "finished" {
                break status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        };
        assert_eq!(status["report"]["pairs"][0]["outcome"], "completed");
        assert_eq!(status["report"]["pairs"][0]["saved"], 1);
        assert_eq!(status["report"]["quit"], false);
        assert!(
            dir.path()
                .join("images/dogs/real/real_dogs_1.jpg")
                .exists()
        );
    }
    #[tokio::test]
    async fn direct_download_during_a_run_keeps_the_quota() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(&dir, 1).await;

        let response = app(&state)
            .oneshot(post_json(
                "/api/runs",
                json!({ "categories": ["dogs"], "image_types": ["real"] }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for_pending(&state).await;

        let response = app(&state)
            .oneshot(post_json(
                "/api/download-image",
                json!({
                    "candidate": { "url": data_url(), "description": "a dog" },
                    "category": "dogs",
                    "image_type": "real",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&state)
            .oneshot(post_json("/api/approval", json!({ "decision": "approve" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let status = loop {
            let response = app(&state)
                .oneshot(get_request("/api/runs"))
                .await
                .expect("response");
            let status = read_json(response).await;
            if status["state"] == "finished" {
                break status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        };
        assert_eq!(status["report"]["pairs"][0]["saved"], 0);
        let saved = std::fs::read_dir(dir.path().join("images/dogs/real"))
            .expect("read dir")
            .count();
        assert_eq!(saved, 1);

        let response = app(&state)
            .oneshot(get_request("/api/progress"))
            .await
            .expect("response");
        assert_eq!(read_json(response).await["real"]["dogs"], 1);
    }
}
