use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::borrow::Cow;
use std::collections::HashMap;
use serde_json::{json, Value};
use tracing::error;
use crate::error::ShoeboxError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(Cow<'static, str>),

    #[error("{0}")]
    NotFound(Cow<'static, str>),

    #[error("{message}")]
    Conflict {
        message: Cow<'static, str>,
        entity: Value,
    },

    #[error("error in the request body")]
    UnprocessableEntity {
        errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
    },

    #[error("an error occurred with the storage: {0}")]
    Storage(ShoeboxError),

    #[error("an internal server error occurred: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict<K: serde::Serialize>(message: impl Into<Cow<'static, str>>, entity: K) -> Self {
        let entity = serde_json::to_value(&entity).unwrap_or(Value::Null);
        Self::Conflict { message: message.into(), entity }
    }

    pub fn unprocessable_entity<K, V>(errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        let mut error_map = HashMap::new();

        for (key, val) in errors {
            error_map
                .entry(key.into())
                .or_insert_with(Vec::new)
                .push(val.into());
        }

        Self::UnprocessableEntity { errors: error_map }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ShoeboxError> for ApiError {
    fn from(value: ShoeboxError) -> Self {
        match value {
            ShoeboxError::PhotoNotFound
            | ShoeboxError::AlbumNotFound
            | ShoeboxError::PhotoNotInAlbum
            | ShoeboxError::TagNotFound(_)
            | ShoeboxError::InvalidObjectKey(_) => Self::NotFound(value.to_string().into()),
            ShoeboxError::PhotoAlreadyInAlbum => Self::BadRequest(value.to_string().into()),
            ShoeboxError::DuplicateTagLink(ref tag_id) => Self::conflict(value.to_string(), json!({ "tagId": tag_id })),
            ShoeboxError::DbIOError(_)
            | ShoeboxError::DbSerializationError(_)
            | ShoeboxError::BucketIOError(_) => Self::Storage(value),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::UnprocessableEntity { ref errors } => {
                json!({ "status": "fail", "message": self.to_string(), "errors": errors })
            }

            Self::Conflict { ref message, ref entity } => {
                json!({ "status": "fail", "message": message, "data": entity })
            }

            Self::Storage(ref e) => {
                error!("Storage error: {:?}", e);
                json!({ "status": "error", "message": "an internal server error occurred" })
            }

            Self::Anyhow(ref e) => {
                error!("Generic error: {:?}", e);
                json!({ "status": "error", "message": "an internal server error occurred" })
            }

            _ => json!({ "status": "fail", "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
