pub mod api;
mod middleware;
mod public;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};

use crate::application::{auth::AuthService, posts::PostService};

pub use middleware::RequestContext;

/// Shared handler state, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub auth: Arc<AuthService>,
    pub site_root: PathBuf,
}

pub fn build_router(state: AppState) -> Router {
    let public = public::build_public_router().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::inject_dynamic_posts,
    ));

    public
        .merge(api::build_api_router())
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
