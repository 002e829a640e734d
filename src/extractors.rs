use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

/// `Json<T>` whose rejections (bad syntax, missing fields, wrong types, wrong
/// content type) surface as `AppError::InvalidArgument`.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                let rejection: JsonRejection = rejection;
                warn!(error = %rejection.body_text(), "malformed request body");
                Err(AppError::InvalidArgument(rejection.body_text()))
            }
        }
    }
}

/// `Path<T>` whose rejections (e.g. an id that is not a UUID) surface as
/// `AppError::InvalidArgument` with the usual JSON body.
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidPath(value)),
            Err(rejection) => {
                let rejection: PathRejection = rejection;
                warn!(error = %rejection.body_text(), "malformed path parameter");
                Err(AppError::InvalidArgument(rejection.body_text()))
            }
        }
    }
}
