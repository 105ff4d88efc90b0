//! JSON admin and reader API under `/api`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::application::error::{AppError, ErrorReport};
use crate::application::posts::{CreatePost, MetaSummary, StatusFilter};
use crate::domain::posts::{Post, PostPatch, PostSummary};
use crate::infra::store::StoreError;

use super::AppState;

pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/meta", get(meta))
}

mod codes {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const STORAGE: &str = "storage_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
struct ApiErrorMessage {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    report: ErrorReport,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status_code();
        // Validation details are caller-supplied and safe to echo; backend
        // failures are reduced to a generic label.
        let (code, message) = match (&err, status) {
            (AppError::Validation(message), _) => (codes::INVALID_INPUT, message.clone()),
            (AppError::Store(StoreError::Backend(_)), _) | (AppError::Infra(_), _) => {
                (codes::STORAGE, "Storage backend failure".to_string())
            }
            (_, StatusCode::BAD_REQUEST) => (codes::INVALID_INPUT, err.to_string()),
            (_, StatusCode::NOT_FOUND) => (codes::NOT_FOUND, "Resource not found".to_string()),
            (_, StatusCode::UNAUTHORIZED) => {
                (codes::UNAUTHORIZED, "Bearer token required".to_string())
            }
            _ => (codes::INTERNAL, "Unexpected error occurred".to_string()),
        };

        Self {
            status,
            code,
            message,
            report: ErrorReport::from_error("infra::http::api::ApiError", status, &err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code,
                message: self.message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    data: Vec<PostSummary>,
    total: usize,
}

async fn authorization(state: &AppState, headers: &HeaderMap) -> Result<bool, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    Ok(state.auth.authorize_header(header).await?)
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if authorization(state, headers).await? {
        Ok(())
    } else {
        Err(AppError::Unauthorized.into())
    }
}

async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let authorized = authorization(&state, &headers).await?;
    let filter = StatusFilter::parse(query.status.as_deref());
    let data = state.posts.list(filter, authorized).await?;
    let total = data.len();
    Ok(Json(ListResponse { data, total }))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.posts.get(&id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(fields): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    require_admin(&state, &headers).await?;
    let post = state.posts.create(fields).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<PostPatch>,
) -> Result<Json<Post>, ApiError> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.posts.update(&id, patch).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    state.posts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn meta(State(state): State<AppState>) -> Result<Json<MetaSummary>, ApiError> {
    Ok(Json(state.posts.meta().await?))
}
