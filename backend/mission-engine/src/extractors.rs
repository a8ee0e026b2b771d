use axum::{
    extract::{FromRequest, Request},
    Json,
};
use validator::Validate;

use crate::handlers::ApiError;

/// JSON body extractor that validates the payload and rejects with the
/// engine's JSON error body instead of axum's plain-text one.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::warn!("Failed to parse JSON request body: {}", rejection);
            ApiError::bad_request(format!("Failed to parse JSON request body: {}", rejection))
        })?;

        value
            .validate()
            .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

        Ok(ValidJson(value))
    }
}
