//! Application state for shared services

use std::sync::Arc;

use crate::domain::deployment::HostingService;
use crate::domain::inference::Predictor;

/// Immutable state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    /// Used by the readiness probe to check the endpoint status
    pub hosting: Arc<dyn HostingService>,
}

impl AppState {
    pub fn new(predictor: Predictor, hosting: Arc<dyn HostingService>) -> Self {
        Self {
            predictor: Arc::new(predictor),
            hosting,
        }
    }
}
