//! Request extractors
//!
//! [`AppJson`] replaces the stock `Json` extractor so body rejections
//! come back in the unified `ApiResponse{code, message}` shape instead
//! of axum's plain-text default. An unparseable or missing expiry date
//! gets its own error code; other body problems map to the generic
//! format code.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

use shared::error::{AppError, ErrorCode};

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(map_rejection(rejection)),
        }
    }
}

fn map_rejection(rejection: JsonRejection) -> AppError {
    let message = rejection.body_text();
    if message.contains("expiry_date") {
        AppError::with_message(ErrorCode::InvalidExpiryDate, message)
    } else {
        AppError::with_message(ErrorCode::InvalidFormat, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request as HttpRequest, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        expiry_date: chrono::NaiveDate,
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_expiry_date_maps_to_expiry_code() {
        let req = json_request(r#"{"expiry_date": "not-a-date"}"#);
        let err = AppJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::InvalidExpiryDate);
    }

    #[tokio::test]
    async fn test_missing_expiry_date_maps_to_expiry_code() {
        let req = json_request("{}");
        let err = AppJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::InvalidExpiryDate);
    }

    #[tokio::test]
    async fn test_other_body_errors_map_to_format_code() {
        let req = json_request("not json at all");
        let err = AppJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[tokio::test]
    async fn test_valid_body_passes_through() {
        let req = json_request(r#"{"expiry_date": "2026-09-15"}"#);
        assert!(AppJson::<Payload>::from_request(req, &()).await.is_ok());
    }
}
