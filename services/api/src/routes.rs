//! Booking service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tracing::error;

use crate::{
    error::ApiError,
    middleware::{CallerIdentity, auth_middleware},
    models::{
        CreateBookingRequest, LoginRequest, LoginResponse, RegisterRequest, TopUpRequest,
        UpdateBookingRequest, UserProfile,
    },
    state::AppState,
};

/// Create the router for the booking service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/rooms/users", get(my_bookings))
        .route("/rooms/booking", post(create_booking))
        .route("/rooms/update/:id", post(update_booking))
        .route("/rooms/payment/:id", post(pay_booking))
        .route("/rooms/booking/:id", delete(cancel_booking))
        .route("/users/topup", post(top_up))
        .route("/users/history", get(history))
        .route("/users/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/rooms", get(get_rooms))
        .route("/rooms/:id", get(get_room))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "booking-service"
    }))
}

/// Register a new user and fire the best-effort welcome email
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.register_user(payload).await?;

    if let Some(mailer) = state.mailer.clone() {
        let (email, name) = (user.email.clone(), user.name.clone());
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&email, &name).await {
                error!("Failed to send welcome email: {}", e);
            }
        });
    }

    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// Log in with email and password, returning a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .service
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    let token = state.jwt.issue(user.id).map_err(ApiError::Internal)?;

    Ok(Json(LoginResponse { token }))
}

/// List all rooms with category, price and stock
pub async fn get_rooms(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.service.list_rooms().await?;
    Ok(Json(rooms))
}

/// Get a single room by id
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.service.room(id).await?;
    Ok(Json(room))
}

/// List the caller's bookings, including payment status
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state.service.my_bookings(caller).await?;
    Ok(Json(bookings))
}

/// Book a room
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create_booking(caller, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Change a booking's room, duration or start date
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.service.update_booking(caller, id, payload).await?;
    Ok(Json(updated))
}

/// Pay a booking from the caller's balance
pub async fn pay_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.service.pay_booking(caller, id).await?;
    Ok(Json(receipt))
}

/// Cancel a booking, refunding it if it was paid
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let notice = state.service.cancel_booking(caller, id).await?;
    Ok(Json(notice))
}

/// Top up the caller's balance
pub async fn top_up(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(payload): Json<TopUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.service.top_up(caller, payload).await?;
    Ok(Json(receipt))
}

/// The caller's activity history, newest first
pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.service.history(caller).await?;
    Ok(Json(json!({
        "message": "User history retrieved successfully",
        "history": entries,
    })))
}

/// The caller's profile, including the current balance
pub async fn profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.service.profile(caller).await?;
    Ok(Json(profile))
}
