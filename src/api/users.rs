//! The users resource.

use serde_json::Value;

use crate::api::ApiResource;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::Pipeline;

/// Client for the users resource.
pub struct Users<'c, C: HttpClient> {
    pipeline: &'c Pipeline<C>,
}

impl<'c, C: HttpClient> Users<'c, C> {
    pub(crate) fn new(pipeline: &'c Pipeline<C>) -> Self {
        Self { pipeline }
    }

    /// Fetches the currently authenticated user.
    ///
    /// # Errors
    ///
    /// Whatever the pipeline or the response decoder raises.
    pub async fn me(&self) -> Result<Value, ApiError> {
        self.get("user", &[]).await
    }
}

impl<C: HttpClient> ApiResource<C> for Users<'_, C> {
    fn pipeline(&self) -> &Pipeline<C> {
        self.pipeline
    }
}
