// src/services/api_server.rs
//! API Server for identity management and authentication
//!
//! Exposes the produced contract of the subsystem over HTTP:
//! - identity creation, resolution and updates
//! - challenge issuance and signature authentication
//! - ownership verification
//!
//! Every failure is answered with a JSON body carrying a stable error kind, so
//! clients can tell "not registered" from "retry later" from "re-sign".

use crate::error::IdentityError;
use crate::models::document::DocumentPatch;
use crate::models::resolution::ResolutionErrorKind;
use crate::services::authenticator::AuthService;
use crate::services::identity_manager::IdentityManager;
use crate::wallet::key_management::KeyManager;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Request payload for issuing a challenge
#[derive(Serialize, Deserialize)]
struct GenerateChallengeRequest {
    address: String,
}

/// Request payload for authenticating with a signed challenge
#[derive(Serialize, Deserialize)]
struct AuthenticateRequest {
    identifier: String,
    signature: String,
    address: String,
}

#[derive(Serialize, Deserialize)]
struct AuthenticateResponse {
    authenticated: bool,
}

/// Request payload for ownership verification
#[derive(Serialize, Deserialize)]
struct VerifyOwnershipRequest {
    identifier: String,
    address: String,
}

#[derive(Serialize, Deserialize)]
struct VerifyOwnershipResponse {
    is_owner: bool,
}

/// Body of every failed request
#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    message: String,
    retryable: bool,
}

fn status_for(err: &IdentityError) -> StatusCode {
    match err {
        IdentityError::InvalidIdentifierFormat(_)
        | IdentityError::InvalidAddress(_)
        | IdentityError::InvalidSignature(_)
        | IdentityError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
        IdentityError::ChallengeNotFound(_)
        | IdentityError::ChallengeExpired(_)
        | IdentityError::IdentifierMismatch { .. }
        | IdentityError::SignatureMismatch { .. } => StatusCode::UNAUTHORIZED,
        IdentityError::OwnershipMismatch { .. } => StatusCode::FORBIDDEN,
        IdentityError::NotFound(_) => StatusCode::NOT_FOUND,
        IdentityError::AlreadyExists(_) => StatusCode::CONFLICT,
        IdentityError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IdentityError::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: IdentityError) -> Response {
    let body = ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        retryable: err.is_retryable(),
    };
    (status_for(&err), Json(body)).into_response()
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    identities: Arc<IdentityManager>,
    auth: Arc<AuthService>,
    /// Signing capability used for identities created through this server
    key_manager: Arc<KeyManager>,
}

impl ApiServer {
    pub fn new(identities: Arc<IdentityManager>, auth: Arc<AuthService>, key_manager: KeyManager) -> Self {
        ApiServer {
            identities,
            auth,
            key_manager: Arc::new(key_manager),
        }
    }

    /// Routes of the API, with the server as shared state.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/create-identity", post(Self::create_identity_handler))
            .route("/resolve-identity/:did", get(Self::resolve_identity_handler))
            .route("/update-identity/:did", put(Self::update_identity_handler))
            .route("/generate-challenge", post(Self::generate_challenge_handler))
            .route("/authenticate", post(Self::authenticate_handler))
            .route("/verify-ownership", post(Self::verify_ownership_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Serves the API on `addr` until `shutdown` completes.
    pub async fn run(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Creates the identity of the server's signing key.
    ///
    /// # Endpoint
    /// POST /create-identity
    async fn create_identity_handler(State(state): State<Arc<ApiServer>>) -> Response {
        match state.identities.create(&state.key_manager).await {
            Ok(user) => (StatusCode::OK, Json(user)).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Resolves an identifier to its document and metadata
    ///
    /// # Endpoint
    /// GET /resolve-identity/:did
    ///
    /// # Responses
    /// - 200 OK: document found
    /// - 400 Bad Request: malformed identifier
    /// - 404 Not Found: identifier not registered
    /// - 500 Internal Server Error: registry failure or malformed document
    async fn resolve_identity_handler(
        State(state): State<Arc<ApiServer>>,
        Path(did): Path<String>,
    ) -> Response {
        let result = state.identities.resolve(&did).await;
        let status = match result.resolution_error {
            None => StatusCode::OK,
            Some(ResolutionErrorKind::InvalidDid) => StatusCode::BAD_REQUEST,
            Some(ResolutionErrorKind::NotFound) => StatusCode::NOT_FOUND,
            Some(ResolutionErrorKind::InternalError) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(result)).into_response()
    }

    /// Applies a partial update to an identity owned by the server's key
    ///
    /// # Endpoint
    /// PUT /update-identity/:did
    async fn update_identity_handler(
        State(state): State<Arc<ApiServer>>,
        Path(did): Path<String>,
        Json(patch): Json<DocumentPatch>,
    ) -> Response {
        match state.identities.update(&did, patch, &state.key_manager).await {
            Ok(document) => (StatusCode::OK, Json(document)).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// # Endpoint
    /// POST /generate-challenge
    async fn generate_challenge_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<GenerateChallengeRequest>,
    ) -> Response {
        match state.auth.generate_challenge(&payload.address) {
            Ok(challenge) => (StatusCode::OK, Json(challenge)).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// # Endpoint
    /// POST /authenticate
    async fn authenticate_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<AuthenticateRequest>,
    ) -> Response {
        match state
            .auth
            .authenticate(&payload.identifier, &payload.signature, &payload.address)
            .await
        {
            Ok(()) => (StatusCode::OK, Json(AuthenticateResponse { authenticated: true })).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// # Endpoint
    /// POST /verify-ownership
    async fn verify_ownership_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyOwnershipRequest>,
    ) -> Response {
        match state
            .auth
            .verify_ownership(&payload.identifier, &payload.address)
            .await
        {
            Ok(is_owner) => (StatusCode::OK, Json(VerifyOwnershipResponse { is_owner })).into_response(),
            Err(e) => error_response(e),
        }
    }
}
