use axum::{
    extract::{Extension, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::user_dto::UserResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::middleware::rate_limit::{strict_rate_limit_middleware, RateLimitState};
use crate::services::auth_service::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::JwtConfig;

pub fn create_auth_router(state: AppState, rate_limit: RateLimitState) -> Router<AppState> {
    // El login lleva rate limiting estricto contra fuerza bruta
    let login = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            rate_limit,
            strict_rate_limit_middleware,
        ));

    let me = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    login.merge(me)
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), JwtConfig::from(&state.config));
    let response = service.login(request).await?;
    Ok(Json(response))
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>, AppError> {
    let service = AuthService::new(state.pool.clone(), JwtConfig::from(&state.config));
    let response = service.me(user.user_id).await?;
    Ok(Json(response))
}
