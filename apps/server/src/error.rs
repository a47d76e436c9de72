use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use vmf_chain::ChainError;
use vmf_wallet::ConnectionError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Wallet(#[from] ConnectionError),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Wallet(e) => match e {
                ConnectionError::Chain(ChainError::MalformedAddress(_)) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                ConnectionError::BalanceFetchFailed(_) | ConnectionError::Timeout { .. } => {
                    (StatusCode::BAD_GATEWAY, e.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            },
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
