//! Lenient form-body extraction.

use axum::{
    extract::{FromRequest, Request},
    Form,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

/// Form fields of a request, or `T::default()` if the body is not a
/// decodable `application/x-www-form-urlencoded` payload.
///
/// Missing fields then surface as the handler's own validation error
/// instead of a content-type rejection.
#[derive(Debug, Clone, Default)]
pub struct FormFields<T>(pub T);

impl<T, S> FromRequest<S> for FormFields<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(fields)) => Ok(Self(fields)),
            Err(rejection) => {
                tracing::debug!(%rejection, "body is not a form, treating fields as absent");
                Ok(Self(T::default()))
            }
        }
    }
}
