use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::booking_dto::CreateBookingRequest;
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::models::booking::{Booking, BookingWithVehicle};
use crate::repositories::booking_repository::NewBooking;
use crate::services::booking_service::BookingService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_booking_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
        .route("/:id/cancel", patch(cancel_booking))
        .route("/vehicle/:vehicle_id", get(vehicle_bookings))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingWithVehicle>>), AppError> {
    request.validate()?;

    let service = BookingService::new(state.booking_gateway.clone());
    let booking = service
        .create(NewBooking {
            vehicle_id: request.vehicle_id,
            user_id: user.user_id,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            destination: request.destination,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            booking,
            "Reserva creada exitosamente".to_string(),
        )),
    ))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<BookingWithVehicle>>, AppError> {
    let service = BookingService::new(state.booking_gateway.clone());
    let bookings = service.find_all(user.user_id, user.role).await?;
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingWithVehicle>, AppError> {
    let service = BookingService::new(state.booking_gateway.clone());
    let booking = service.find_by_id(id, user.user_id, user.role).await?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingWithVehicle>>, AppError> {
    let service = BookingService::new(state.booking_gateway.clone());
    let booking = service.cancel(id, user.user_id, user.role).await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Reserva anulada".to_string(),
    )))
}

async fn vehicle_bookings(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let service = BookingService::new(state.booking_gateway.clone());
    let bookings = service.vehicle_bookings(vehicle_id).await?;
    Ok(Json(bookings))
}
