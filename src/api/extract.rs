//! Request body extraction shared by the auth endpoints.
//!
//! The admin console posts JSON, while plain HTML forms post urlencoded or
//! multipart bodies. [`FlexibleBody`] accepts all three and reports any
//! malformed body as a 400 with a `{"message"}` body.

use crate::types::AppError;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Form,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Deserializes `T` from a JSON, urlencoded or multipart request body.
///
/// Bodies without a recognised form content type are parsed as JSON.
pub struct FlexibleBody<T>(pub T);

impl<S, T> FromRequest<S> for FlexibleBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| rejected(e.status(), format!("Invalid form body: {}", e)))?;
            return Ok(Self(value));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejected(e.status(), format!("Invalid multipart body: {}", e)))?;
            return multipart_fields(multipart).await.and_then(from_value).map(Self);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| rejected(e.status(), format!("Unreadable request body: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON body: {}", e)))
    }
}

/// Collects the text fields of a multipart body into a JSON object.
/// Unnamed parts are skipped; a repeated name keeps the last value.
async fn multipart_fields(mut multipart: Multipart) -> Result<Value, AppError> {
    let mut fields = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejected(e.status(), format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field
            .text()
            .await
            .map_err(|e| rejected(e.status(), format!("Invalid multipart field: {}", e)))?;
        fields.insert(name, Value::String(text));
    }

    Ok(Value::Object(fields))
}

/// A body cut off by the size limit stays a 413; everything else is a 400.
fn rejected(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidInput(message)
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}
