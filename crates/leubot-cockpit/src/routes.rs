//! Route table and request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use leubot_middleware::EventBus;
use leubot_runtime::ArmHandle;
use leubot_types::{ArmReply, ArmRequest, IdentityInfo, Joint, PoseCommand};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::stream;

const READ_WRITE: &str = "GET, HEAD, OPTIONS, PUT";
const WRITE_ONLY: &str = "OPTIONS, PUT";

/// Where the API is published.  Used for the route prefix and for the
/// `Location` header of new sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Public host (and port), e.g. `"api.example.org"`.
    pub host: String,
    /// Scheme prefix including `://`.
    pub proto: String,
    pub path: String,
    /// Empty to serve directly under `/{path}`.
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "localhost:6789".into(),
            proto: "http://".into(),
            path: "leubot".into(),
            version: "v1".into(),
        }
    }
}

impl ApiConfig {
    /// `/{path}/{version}`, skipping empty segments.  Empty when both are.
    pub fn base_path(&self) -> String {
        let mut base = String::new();
        for segment in [&self.path, &self.version] {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                base.push('/');
                base.push_str(segment);
            }
        }
        base
    }

    /// Absolute URL of the session resource for `token`.
    pub fn session_location(&self, token: &str) -> String {
        format!(
            "{}{}{}/user/{}",
            self.proto,
            self.host,
            self.base_path(),
            token
        )
    }
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub arm: ArmHandle,
    pub bus: EventBus,
    pub api: Arc<ApiConfig>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBody {
    pub name: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JointInfo {
    pub name: String,
    pub value: u16,
}

#[derive(Debug, Deserialize)]
pub struct JointCommand {
    pub token: String,
    pub value: u16,
}

#[derive(Debug, Deserialize)]
pub struct PostureCommand {
    pub token: String,
    #[serde(flatten)]
    pub command: PoseCommand,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

type JsonBody<T> = Result<Json<T>, JsonRejection>;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the complete application router for `state`.
pub fn build_router(state: AppState) -> Router {
    let mut api = Router::new()
        .route(
            "/user",
            get(get_user)
                .post(add_user)
                .options(|| preflight("GET, HEAD, OPTIONS, POST")),
        )
        .route(
            "/user/{token}",
            delete(remove_user).options(|| preflight("DELETE, OPTIONS")),
        )
        .route(
            "/posture",
            get(get_posture)
                .put(put_posture)
                .options(|| preflight(READ_WRITE)),
        )
        .route("/reset", put(put_reset).options(|| preflight(WRITE_ONLY)))
        .route("/sleep", put(put_sleep).options(|| preflight(WRITE_ONLY)))
        .route("/events", get(stream::events));

    for joint in Joint::ALL {
        api = api.route(
            &format!("/{}", joint.resource()),
            get(move |state: State<AppState>| get_joint(state, joint))
                .put(move |state: State<AppState>, body: JsonBody<JointCommand>| {
                    put_joint(state, joint, body)
                })
                .options(|| preflight(READ_WRITE)),
        );
    }

    let base = state.api.base_path();
    let app = if base.is_empty() {
        api
    } else {
        Router::new().nest(&base, api)
    };

    app.layer(middleware::map_response(cors_headers))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn preflight(methods: &'static str) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::ACCESS_CONTROL_ALLOW_METHODS, methods)],
    )
}

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("X-API-Key, Content-Type"),
    );
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

async fn add_user(
    State(state): State<AppState>,
    body: JsonBody<IdentityInfo>,
) -> Result<Response, ApiError> {
    let Json(info) = body?;
    let reply = state
        .arm
        .call(ArmRequest::AcquireLease {
            name: info.name,
            email: info.email,
        })
        .await?;
    let ArmReply::Granted(identity) = reply else {
        return Err(ApiError::unexpected(reply));
    };
    let location = state.api.session_location(&identity.token);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(SessionBody {
            name: identity.name,
            email: identity.email,
            token: identity.token,
        }),
    )
        .into_response())
}

async fn get_user(State(state): State<AppState>) -> Result<Json<IdentityInfo>, ApiError> {
    match state.arm.call(ArmRequest::GetIdentity).await? {
        ArmReply::Identity(info) => Ok(Json(info.unwrap_or_default())),
        other => Err(ApiError::unexpected(other)),
    }
}

async fn remove_user(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.arm.call(ArmRequest::ReleaseLease { token }).await? {
        ArmReply::Released => Ok(StatusCode::NO_CONTENT),
        other => Err(ApiError::unexpected(other)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arm
// ─────────────────────────────────────────────────────────────────────────────

async fn get_joint(State(state): State<AppState>, joint: Joint) -> Result<Json<JointInfo>, ApiError> {
    match state.arm.call(ArmRequest::GetJoint(joint)).await? {
        ArmReply::Joint { joint, value } => Ok(Json(JointInfo {
            name: joint.resource().to_string(),
            value,
        })),
        other => Err(ApiError::unexpected(other)),
    }
}

async fn put_joint(
    State(state): State<AppState>,
    joint: Joint,
    body: JsonBody<JointCommand>,
) -> Result<StatusCode, ApiError> {
    let Json(JointCommand { token, value }) = body?;
    performed(
        &state,
        ArmRequest::SetJoint {
            joint,
            token,
            value,
        },
    )
    .await
}

async fn get_posture(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.arm.call(ArmRequest::GetPose).await? {
        ArmReply::Pose(pose) => Ok(Json(pose).into_response()),
        other => Err(ApiError::unexpected(other)),
    }
}

async fn put_posture(
    State(state): State<AppState>,
    body: JsonBody<PostureCommand>,
) -> Result<StatusCode, ApiError> {
    let Json(PostureCommand { token, command }) = body?;
    performed(&state, ArmRequest::SetPose { token, command }).await
}

async fn put_reset(
    State(state): State<AppState>,
    body: JsonBody<TokenBody>,
) -> Result<StatusCode, ApiError> {
    let Json(TokenBody { token }) = body?;
    performed(&state, ArmRequest::Reset { token }).await
}

async fn put_sleep(
    State(state): State<AppState>,
    body: JsonBody<TokenBody>,
) -> Result<StatusCode, ApiError> {
    let Json(TokenBody { token }) = body?;
    performed(&state, ArmRequest::Sleep { token }).await
}

async fn performed(state: &AppState, request: ArmRequest) -> Result<StatusCode, ApiError> {
    match state.arm.call(request).await? {
        ArmReply::Performed => Ok(StatusCode::ACCEPTED),
        other => Err(ApiError::unexpected(other)),
    }
}
