//! Body and query extractors that reject with the JSON error body

use axum::{
    extract::FromRequest,
    extract::FromRequestParts,
    response::{IntoResponse, Response},
};

use crate::db::CollegeRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// `axum::Json` with `AppError` as its rejection
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// `axum::extract::Query` with `AppError` as its rejection
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// A referenced college must exist before it is written to a row
pub(crate) async fn require_college(state: &AppState, college_id: Option<&str>) -> Result<()> {
    let Some(id) = college_id else {
        return Ok(());
    };

    match CollegeRepository::new(state.db()).get(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!("Unknown college: {}", id))),
    }
}
