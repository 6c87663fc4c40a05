//! The guarded request pipeline.
//!
//! Every guarded request walks the same stages in order:
//!
//! 1. **Skip check**: exempt requests go straight to the action (after the
//!    service's `block` hook agrees).
//! 2. **Presence check**: the request must carry a nonce.
//! 3. **Consumption**: the nonce must be live, and is invalidated.
//! 4. **Reissue**: a fresh nonce is minted for the caller's next request.
//!
//! A denial at any stage answers with the denial status; an operational error
//! answers with `500`. In both cases the protected action never runs.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::nonce::{Denial, NONCE_HEADER, NonceError, NonceService, SharedNonceService, Verdict};

/// A step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SkipCheck,
    PresenceCheck,
    Consume,
    Reissue,
}

/// Where a request ended up after the pipeline ran.
#[derive(Debug)]
pub enum Admission {
    /// The request is exempt; run the action without touching nonces.
    Exempt,
    /// The protocol refused the request.
    Denied { stage: Stage, denial: Denial },
    /// The presented nonce was consumed and `nonce` is the caller's next one.
    Admitted { nonce: String },
    /// A stage failed operationally.
    Failed { stage: Stage, error: NonceError },
}

impl Admission {
    /// Whether the protected action may run.
    pub fn allows_action(&self) -> bool {
        matches!(self, Admission::Exempt | Admission::Admitted { .. })
    }
}

/// Runs the pipeline stages against `request` without invoking any action.
///
/// Stops at the first stage that denies or fails.
pub async fn admit<S>(service: &S, request: &Parts) -> Admission
where
    S: NonceService + ?Sized,
{
    if service.skip(request) {
        return match gate(Stage::SkipCheck, service.block(request).await) {
            Some(stop) => stop,
            None => Admission::Exempt,
        };
    }

    if let Some(stop) = gate(Stage::PresenceCheck, service.provided(request).await) {
        return stop;
    }
    if let Some(stop) = gate(Stage::Consume, service.consume(request).await) {
        return stop;
    }

    match service.get_nonce(request).await {
        Ok(nonce) => Admission::Admitted { nonce },
        Err(error) => Admission::Failed {
            stage: Stage::Reissue,
            error,
        },
    }
}

fn gate(stage: Stage, result: Result<Verdict, NonceError>) -> Option<Admission> {
    match result {
        Ok(Verdict::Proceed) => None,
        Ok(Verdict::Deny(denial)) => Some(Admission::Denied { stage, denial }),
        Err(error) => Some(Admission::Failed { stage, error }),
    }
}

/// axum middleware enforcing the nonce protocol in front of a handler.
///
/// Install it with [`axum::middleware::from_fn_with_state`], or let
/// [`Bastion::protect`](crate::Bastion::protect) do it.
///
/// On success the handler's response gets the freshly issued nonce in the
/// `nonce` header, replacing any value the handler set.
pub async fn nonced(
    State(service): State<SharedNonceService>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let admission = admit(service.as_ref(), &parts).await;
    let path = parts.uri.path().to_string();
    let request = Request::from_parts(parts, body);

    match admission {
        Admission::Exempt => next.run(request).await,
        Admission::Denied { stage, denial } => {
            tracing::debug!(?stage, ?denial, path = %path, "request denied");
            denial.status().into_response()
        }
        Admission::Failed { stage, error } => {
            tracing::warn!(?stage, path = %path, "nonce pipeline failed: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Admission::Admitted { nonce } => {
            let value = match HeaderValue::from_str(&nonce) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(path = %path, "reissued nonce is not a valid header value: {}", e);
                    if let Err(e) = service.clear(&nonce).await {
                        tracing::warn!(path = %path, "failed to clear unusable nonce: {}", e);
                    }
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            let mut response = next.run(request).await;
            response.headers_mut().insert(NONCE_HEADER, value);
            response
        }
    }
}
