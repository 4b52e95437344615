use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::logging_middleware;
use super::predict;
use super::state::AppState;

/// Browsers may call the façade from any origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(predict::index))
        .route("/predict", post(predict::predict))
        .route("/demo", get(predict::demo))
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Settings;
    use crate::domain::inference::{npy, PayloadMode, Predictor};
    use crate::domain::pipeline::{Pipeline, PipelineOptions};
    use crate::infrastructure::sagemaker::InMemorySageMaker;

    const BOUNDARY: &str = "test-boundary";

    fn app(sagemaker: Arc<InMemorySageMaker>, mode: PayloadMode) -> Router {
        let predictor = Predictor::new(sagemaker.clone(), "abc1234", mode);
        create_router(AppState::new(predictor, sagemaker))
    }

    fn digit_png() -> Vec<u8> {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([128])));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn multipart(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_index_returns_text() {
        let response = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image)
            .oneshot(get("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/predict"));
    }

    #[tokio::test]
    async fn test_predict_sends_npy_and_returns_first_prediction() {
        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": [7] })),
        );

        let response = app(sagemaker.clone(), PayloadMode::Image)
            .oneshot(multipart("file", "seven.png", &digit_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "filename": "seven.png", "prediction": 7 })
        );

        let invocations = sagemaker.invocations().unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].endpoint_name, "abc1234");
        assert_eq!(invocations[0].contract.content_type, "application/x-npy");
        assert_eq!(&invocations[0].body[..6], npy::NPY_MAGIC);
    }

    #[tokio::test]
    async fn test_json_mode_sends_document_list() {
        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": "topic-3" })),
        );

        let response = app(sagemaker.clone(), PayloadMode::Json)
            .oneshot(multipart("file", "doc.txt", b"gpu prices are falling"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["prediction"], "topic-3");

        let invocations = sagemaker.invocations().unwrap();
        assert_eq!(invocations[0].body, br#"["gpu prices are falling"]"#.to_vec());
        assert_eq!(invocations[0].contract.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_predict_rejects_non_image() {
        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": [7] })),
        );

        let response = app(sagemaker.clone(), PayloadMode::Image)
            .oneshot(multipart("file", "notes.txt", b"not an image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["type"],
            "invalid_request_error"
        );
        assert!(sagemaker.invocations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_predict_requires_file_field() {
        let response = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image)
            .oneshot(multipart("image", "seven.png", &digit_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "missing_file");
    }

    #[tokio::test]
    async fn test_endpoint_failure_is_unavailable() {
        let response = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image)
            .oneshot(multipart("file", "seven.png", &digit_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_response_without_prediction_field_is_unavailable() {
        let sagemaker =
            Arc::new(InMemorySageMaker::new().with_response("abc1234", json!({ "scores": [0.9] })));

        let response = app(sagemaker, PayloadMode::Image)
            .oneshot(multipart("file", "seven.png", &digit_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_demo_uses_builtin_sample() {
        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": [7] })),
        );

        let response = app(sagemaker.clone(), PayloadMode::Image)
            .oneshot(get("/demo"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "filename": "demo", "prediction": 7 })
        );
        assert_eq!(sagemaker.invocations().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_ready_reflects_endpoint_status() {
        let missing = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image)
            .oneshot(get("/ready"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);

        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": [1] })),
        );
        let serving = app(sagemaker, PayloadMode::Image)
            .oneshot(get("/ready"))
            .await
            .unwrap();
        assert_eq!(serving.status(), StatusCode::OK);
        assert_eq!(json_body(serving).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_live_and_health() {
        let router = app(Arc::new(InMemorySageMaker::new()), PayloadMode::Image);

        let live = router.clone().oneshot(get("/live")).await.unwrap();
        let health = router.oneshot(get("/health")).await.unwrap();

        assert_eq!(live.status(), StatusCode::OK);
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trained_commit_serves_canned_prediction() {
        let env: HashMap<String, String> = HashMap::from([
            ("EVENT_SHA".to_string(), "abc1234def".to_string()),
            ("SAGEMAKER_IAM_ROLE".to_string(), "arn:aws:iam::123:role/sm".to_string()),
            ("SAGEMAKER_ECR_IMAGE".to_string(), "123.dkr.ecr/repo:tag".to_string()),
        ]);
        let sagemaker = Arc::new(
            InMemorySageMaker::new().with_response("abc1234", json!({ "prediction": [7] })),
        );
        let pipeline = Pipeline::new(
            Arc::new(Settings::resolve(&env).unwrap()),
            sagemaker.clone(),
            sagemaker.clone(),
            PipelineOptions {
                poll_interval: Duration::ZERO,
                ..Default::default()
            },
        );

        let (submission, deployment) = pipeline.run().await.unwrap();
        assert_eq!(submission.job_name, "abc1234");
        assert_eq!(deployment.endpoint_name, "abc1234");

        let predictor = Predictor::new(
            sagemaker.clone(),
            deployment.endpoint_name.clone(),
            pipeline.options().model.payload_mode(),
        );
        let response = create_router(AppState::new(predictor, sagemaker.clone()))
            .oneshot(multipart("file", "seven.png", &digit_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "filename": "seven.png", "prediction": 7 })
        );
        assert_eq!(
            sagemaker.invocations().unwrap()[0].contract,
            sagemaker.models().unwrap()[0].contract
        );
    }
}
