//! Forwards payloads to an endpoint and pulls out the prediction

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{demo_grid, ImageTransform, InferenceClient, PayloadMode, DEMO_DOCUMENT};
use crate::domain::DomainError;

/// Field of the endpoint's JSON response holding the prediction
pub const PREDICTION_FIELD: &str = "prediction";

#[derive(Clone)]
pub struct Predictor {
    client: Arc<dyn InferenceClient>,
    endpoint_name: String,
    mode: PayloadMode,
    transform: ImageTransform,
}

impl Predictor {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        endpoint_name: impl Into<String>,
        mode: PayloadMode,
    ) -> Self {
        Self {
            client,
            endpoint_name: endpoint_name.into(),
            mode,
            transform: ImageTransform::mnist(),
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn mode(&self) -> PayloadMode {
        self.mode
    }

    /// Shape an uploaded file into the request body for this endpoint
    pub fn encode_upload(&self, bytes: &[u8]) -> Result<Vec<u8>, DomainError> {
        match self.mode {
            PayloadMode::Image => self.transform.apply(bytes)?.to_npy(),
            PayloadMode::Json => {
                let document = std::str::from_utf8(bytes).map_err(|e| {
                    DomainError::transform(format!("Uploaded document is not UTF-8: {}", e))
                })?;
                encode_documents(&[document])
            }
        }
    }

    /// Request body for the built-in sample of this payload mode
    pub fn encode_demo(&self) -> Result<Vec<u8>, DomainError> {
        match self.mode {
            PayloadMode::Image => demo_grid()?.to_npy(),
            PayloadMode::Json => encode_documents(&[DEMO_DOCUMENT]),
        }
    }

    pub async fn predict(&self, bytes: &[u8]) -> Result<Value, DomainError> {
        let body = self.encode_upload(bytes)?;
        self.invoke(body).await
    }

    pub async fn predict_demo(&self) -> Result<Value, DomainError> {
        let body = self.encode_demo()?;
        self.invoke(body).await
    }

    async fn invoke(&self, body: Vec<u8>) -> Result<Value, DomainError> {
        let contract = self.mode.contract();
        debug!(
            endpoint = %self.endpoint_name,
            content_type = contract.content_type,
            bytes = body.len(),
            "Invoking endpoint"
        );

        let response = self
            .client
            .invoke(&self.endpoint_name, contract, body)
            .await?;

        let decoded: Value = serde_json::from_slice(&response).map_err(|e| {
            DomainError::provider(
                "endpoint",
                format!("Endpoint returned invalid JSON: {}", e),
            )
        })?;

        extract_prediction(&decoded)
    }
}

fn encode_documents(documents: &[&str]) -> Result<Vec<u8>, DomainError> {
    serde_json::to_vec(documents)
        .map_err(|e| DomainError::internal(format!("Failed to encode documents: {}", e)))
}

/// Take `prediction` from the response; batched responses carry one entry
/// per input, so the first element is returned for a single upload
pub fn extract_prediction(response: &Value) -> Result<Value, DomainError> {
    let field = response.get(PREDICTION_FIELD).ok_or_else(|| {
        DomainError::provider(
            "endpoint",
            format!("Endpoint response has no '{}' field", PREDICTION_FIELD),
        )
    })?;

    match field {
        Value::Array(items) => items.first().cloned().ok_or_else(|| {
            DomainError::provider(
                "endpoint",
                format!("Endpoint response '{}' is empty", PREDICTION_FIELD),
            )
        }),
        other => Ok(other.clone()),
    }
}
