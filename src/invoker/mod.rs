pub mod function;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::payload::EmbeddingRequest;

pub use function::FunctionInvoker;

/// Normalised result of an embedding call. Failures are data, not errors: the worker
/// decides what a failure means for the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl InvokeOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait EmbeddingInvoker: Send + Sync {
    async fn invoke(&self, request: &EmbeddingRequest) -> InvokeOutcome;
}
