//! # API REST
//!
//! REST API implementation for CarePulse registration.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request/response types and `carepulse-core` for everything else.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    CreateUserReq, DocumentUpload, ErrorRes, FieldErrorsRes, HealthRes, HealthService,
    ListPatientsRes, NewAppointmentRes, PatientRes, RegisterPatientReq, RegisterPatientRes,
    RegistrationFormRes, UserRes,
};
use carepulse_core::form::{registration_layout, UploadedFile};
use carepulse_core::{
    load_new_appointment, CoreConfig, FieldErrors, FormController, LocalStore, NewUser,
    PatientActions, RegistrationSubmitter, Route, ShardableUuid, SubmitOutcome, User,
};

/// Default listen address when `CAREPULSE_REST_ADDR` is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<LocalStore>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            store: Arc::new(LocalStore::new(cfg)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_user,
        get_user,
        registration_form,
        register_patient,
        list_patients,
        get_patient,
        get_document,
        new_appointment,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        FieldErrorsRes,
        CreateUserReq,
        UserRes,
        RegistrationFormRes,
        DocumentUpload,
        RegisterPatientReq,
        RegisterPatientRes,
        api_shared::DocumentRefRes,
        PatientRes,
        ListPatientsRes,
        NewAppointmentRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/register", post(register_patient))
        .route("/forms/register", get(registration_form))
        .route("/patients", get(list_patients))
        .route("/patients/:user_id", get(get_patient))
        .route("/patients/:user_id/document", get(get_document))
        .route("/patients/:user_id/new-appointment", get(new_appointment))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the REST API until the server stops.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, cfg: Arc<CoreConfig>) -> anyhow::Result<()> {
    std::fs::create_dir_all(cfg.patient_data_dir())?;
    tracing::info!(
        "++ Serving patient data from {}",
        cfg.patient_data_dir().display()
    );

    let app = router(AppState::new(cfg));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Handler failures, each mapped to a status code and a JSON body.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Invalid(FieldErrors),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FieldErrorsRes { errors }),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorRes { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorRes { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorRes { message })).into_response()
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorRes { message })).into_response()
            }
        }
    }
}

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{context}: {e}");
    ApiError::Internal("Internal error".into())
}

fn parse_user_id(raw: &str) -> Result<ShardableUuid, ApiError> {
    ShardableUuid::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid user id: {e}")))
}

async fn require_user(state: &AppState, user_id: &ShardableUuid) -> Result<User, ApiError> {
    state
        .store
        .get_user(user_id)
        .await
        .map_err(|e| internal("Get user error", e))?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))
}

/// The pipeline's navigation target is returned to the client as `redirect`.
struct ResponseNavigator;

impl carepulse_core::Navigator for ResponseNavigator {
    fn push(&self, route: &Route) {
        tracing::debug!(%route, "redirecting client");
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created, or the existing user for this email", body = UserRes),
        (status = 422, description = "Validation failed", body = FieldErrorsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Sign up. Signing up again with a known email returns the existing account.
#[axum::debug_handler]
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserReq>,
) -> Result<(StatusCode, Json<UserRes>), ApiError> {
    let validated = NewUser::from(req).validate().map_err(ApiError::Invalid)?;
    let user = state
        .store
        .create_user(validated)
        .await
        .map_err(|e| internal("Create user error", e))?;
    Ok((StatusCode::CREATED, Json(UserRes::from(user))))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = String, Path, description = "32-hex user id")),
    responses(
        (status = 200, description = "User", body = UserRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_user(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Result<Json<UserRes>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let user = require_user(&state, &user_id).await?;
    Ok(Json(UserRes::from(user)))
}

#[utoipa::path(
    get,
    path = "/forms/register",
    responses(
        (status = 200, description = "Registration form with default values", body = RegistrationFormRes)
    )
)]
/// The registration form as rendered controls, with default values and no errors.
#[axum::debug_handler]
async fn registration_form(State(state): State<AppState>) -> Json<RegistrationFormRes> {
    let catalog = state.store.config().catalog();
    let form = FormController::new(catalog);
    let sections = registration_layout(catalog)
        .iter()
        .map(|section| section.render(&form, false))
        .collect();
    Json(RegistrationFormRes::new(sections))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/register",
    params(("user_id" = String, Path, description = "32-hex user id")),
    request_body = RegisterPatientReq,
    responses(
        (status = 201, description = "Patient registered", body = RegisterPatientRes),
        (status = 400, description = "Malformed id or document", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes),
        (status = 409, description = "User already registered", body = ErrorRes),
        (status = 422, description = "Validation failed", body = FieldErrorsRes),
        (status = 500, description = "Registration failed", body = ErrorRes)
    )
)]
/// Validate and submit the registration form for a user.
#[axum::debug_handler]
async fn register_patient(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Json(req): Json<RegisterPatientReq>,
) -> Result<(StatusCode, Json<RegisterPatientRes>), ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let user = require_user(&state, &user_id).await?;

    let document = req
        .identification_document
        .map(UploadedFile::try_from)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut form = FormController::with_values(state.store.config().catalog(), req.values);
    form.set_document(document)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submitter = RegistrationSubmitter::new(state.store.clone(), ResponseNavigator);
    match submitter.submit(&mut form, &user).await {
        SubmitOutcome::Navigated(route) => {
            let patient = state
                .store
                .get_patient(&user.id)
                .await
                .map_err(|e| internal("Get patient error", e))?
                .ok_or_else(|| internal("Get patient error", "registered patient not found"))?;
            Ok((
                StatusCode::CREATED,
                Json(RegisterPatientRes {
                    redirect: route.to_string(),
                    patient: PatientRes::from(patient),
                }),
            ))
        }
        SubmitOutcome::Invalid(errors) => Err(ApiError::Invalid(errors)),
        SubmitOutcome::AlreadyRegistered { message } => Err(ApiError::Conflict(message)),
        SubmitOutcome::Failed { message } => Err(ApiError::Internal(message)),
        SubmitOutcome::Ignored => Err(ApiError::Conflict(
            "A registration is already in progress".into(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Registered patients, most recent first", body = ListPatientsRes)
    )
)]
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<ListPatientsRes> {
    let patients = state
        .store
        .list_patients()
        .into_iter()
        .map(PatientRes::from)
        .collect();
    Json(ListPatientsRes { patients })
}

#[utoipa::path(
    get,
    path = "/patients/{user_id}",
    params(("user_id" = String, Path, description = "32-hex user id")),
    responses(
        (status = 200, description = "The user's patient record", body = PatientRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "User has not registered", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let patient = state
        .store
        .get_patient(&user_id)
        .await
        .map_err(|e| internal("Get patient error", e))?
        .ok_or_else(|| ApiError::NotFound(format!("no patient registered for user {user_id}")))?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{user_id}/document",
    params(("user_id" = String, Path, description = "32-hex user id")),
    responses(
        (status = 200, description = "The stored identification document", body = DocumentUpload),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "No patient or no document", body = ErrorRes)
    )
)]
/// The identification document uploaded at registration, base64-encoded.
#[axum::debug_handler]
async fn get_document(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Result<Json<DocumentUpload>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let patient = state
        .store
        .get_patient(&user_id)
        .await
        .map_err(|e| internal("Get patient error", e))?
        .ok_or_else(|| ApiError::NotFound(format!("no patient registered for user {user_id}")))?;
    let doc = patient
        .identification_document
        .ok_or_else(|| ApiError::NotFound("no identification document on record".into()))?;

    let bytes = state
        .store
        .read_document(&patient.id, &doc.hash)
        .map_err(|e| internal("Read document error", e))?;
    Ok(Json(DocumentUpload::from_bytes(
        &bytes,
        &doc.file_name,
        doc.media_type.as_deref().unwrap_or_default(),
    )))
}

#[utoipa::path(
    get,
    path = "/patients/{user_id}/new-appointment",
    params(("user_id" = String, Path, description = "32-hex user id")),
    responses(
        (status = 200, description = "New-appointment page data", body = NewAppointmentRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes)
    )
)]
/// Data for the appointment page the registration flow redirects to.
#[axum::debug_handler]
async fn new_appointment(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> Result<Json<NewAppointmentRes>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    require_user(&state, &user_id).await?;
    let view = load_new_appointment(state.store.as_ref(), &user_id)
        .await
        .map_err(|e| internal("New appointment error", e))?;
    Ok(Json(NewAppointmentRes::from(view)))
}
