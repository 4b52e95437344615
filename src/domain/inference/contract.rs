//! Request/response encoding agreed between deployment and invocation
//!
//! The serving script decodes request bodies according to their content
//! type. A model variant picks one payload mode; deployment and the façade
//! both read the contract from that mode.

use serde::Serialize;

pub const CONTENT_TYPE_NPY: &str = "application/x-npy";
pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SerializationContract {
    pub content_type: &'static str,
    pub accept: &'static str,
}

impl SerializationContract {
    /// float32 arrays in, JSON out (digit classifier)
    pub const NPY_TO_JSON: Self = Self {
        content_type: CONTENT_TYPE_NPY,
        accept: CONTENT_TYPE_JSON,
    };

    /// JSON documents in, JSON out (topic model)
    pub const JSON_TO_JSON: Self = Self {
        content_type: CONTENT_TYPE_JSON,
        accept: CONTENT_TYPE_JSON,
    };
}

/// How uploads are shaped before they are forwarded. Each model variant
/// serves exactly one of these, and its contract comes from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// Decode, resize and send as a float32 NPY array
    #[default]
    Image,
    /// Send the uploaded text as a JSON list holding one document
    Json,
}

impl PayloadMode {
    pub fn contract(&self) -> SerializationContract {
        match self {
            Self::Image => SerializationContract::NPY_TO_JSON,
            Self::Json => SerializationContract::JSON_TO_JSON,
        }
    }
}
