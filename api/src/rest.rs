use crate::auth::{require_bearer, AuthUser};
use crate::errors::Error;
use crate::metrics::{
    DEVICES_CREATED_TOTAL, STORE_ERRORS_TOTAL, TELEMETRY_RECORDED_TOTAL, USERS_CREATED_TOTAL,
};
use crate::model::{
    CreateDeviceRequest, CreateTelemetryRequest, CreateUserRequest, Device, ErrorResponse,
    MeResponse, NewDevice, NewTelemetry, Telemetry, User,
};
use crate::store::{DeviceStore, Storage, UserStore};
use crate::validate::{
    parse_device_id, parse_recorded_at, validate_device, validate_telemetry, validate_user,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub auth_token: Arc<str>,
}

pub fn create_router(store: Arc<dyn Storage>, auth_token: &str) -> Router {
    let state = AppState {
        store,
        auth_token: Arc::from(auth_token),
    };

    let public = Router::new()
        .route("/", get(welcome))
        .route("/users", post(create_user));

    let private = Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/me", get(me))
        .route("/devices", post(create_device).get(list_devices))
        .route("/devices/:id", get(get_device))
        .route("/telemetries", post(create_telemetry))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    public
        .merge(private)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to the IoT Device API"
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid request payload"))?;
    validate_user(&req)?;

    let user = User::new(req.username, req.email);
    state.store.create_user(user.clone()).await?;

    USERS_CREATED_TOTAL.inc();
    debug!("Created user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.store.get_user(&id).await?;
    Ok(Json(user))
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        message: "You are authenticated!".to_string(),
        user_id: user.user_id,
    })
}

async fn create_device(
    State(state): State<AppState>,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid request payload"))?;
    validate_device(&req)?;

    let device = state
        .store
        .create_device(NewDevice {
            name: req.name,
            device_type: req.device_type,
            mac_address: req.mac_address,
            is_active: req.is_active.unwrap_or(true),
        })
        .await?;

    DEVICES_CREATED_TOTAL.inc();
    debug!("Registered device {} ({})", device.id, device.mac_address);
    Ok((StatusCode::CREATED, Json(device)))
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.store.list_devices().await?;
    Ok(Json(devices))
}

async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let id = parse_device_id(&id)?;
    let device = state.store.get_device(id).await?;
    Ok(Json(device))
}

async fn create_telemetry(
    State(state): State<AppState>,
    payload: Result<Json<CreateTelemetryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Telemetry>), ApiError> {
    let Json(req) = payload.map_err(|e| {
        ApiError::bad_request(format!("Invalid request payload: {}", e.body_text()))
    })?;
    validate_telemetry(&req)?;

    // The device must exist before a reading can reference it
    state.store.get_device(req.device_id).await.map_err(|e| match e {
        Error::NotFound(_) => ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Device with ID {} not found", req.device_id),
        ),
        other => other.into(),
    })?;

    let telemetry = state
        .store
        .add_telemetry(NewTelemetry {
            device_id: req.device_id,
            data_type: req.data_type,
            value: req.value,
            recorded_at: parse_recorded_at(req.recorded_at.as_deref()),
        })
        .await?;

    TELEMETRY_RECORDED_TOTAL.inc();
    Ok((StatusCode::CREATED, Json(telemetry)))
}

/// Error response rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            Error::DuplicateKey(msg) => Self::new(StatusCode::CONFLICT, msg),
            other => {
                error!("Store error: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            STORE_ERRORS_TOTAL.inc();
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
