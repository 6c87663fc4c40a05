//! Endpoints every bastion publishes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{OriginalUri, Request, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::client::Directory;
use crate::nonce::{NONCE_HEADER, SharedNonceService};

pub(crate) const NEW_NONCE_ROUTE: &str = "/new-nonce";
pub(crate) const DIRECTORY_ROUTE: &str = "/directory";

/// State shared by the bastion's own handlers.
#[derive(Clone)]
pub struct BastionState {
    pub service: SharedNonceService,
    /// Published endpoints as paths relative to the bastion's mount point.
    pub endpoints: Arc<Directory>,
    /// Absolute URL of the mount point, when known up front.
    pub public_url: Option<Arc<str>>,
}

/// `HEAD /new-nonce`: answers `200` with an empty body and a fresh `nonce`
/// header. Any other method gets `405`.
pub async fn new_nonce(State(state): State<BastionState>, request: Request) -> Response {
    if request.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let (parts, _) = request.into_parts();
    let nonce = match state.service.get_nonce(&parts).await {
        Ok(nonce) => nonce,
        Err(e) => {
            tracing::warn!("failed to issue nonce: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match HeaderValue::from_str(&nonce) {
        Ok(value) => {
            let mut response = StatusCode::OK.into_response();
            response.headers_mut().insert(NONCE_HEADER, value);
            response
        }
        Err(e) => {
            tracing::warn!("issued nonce is not a valid header value: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /directory`: the published endpoint names and their absolute URLs.
///
/// Without a configured public URL, the base is taken from the request: its
/// authority (or `Host` header) plus the path the router is mounted at.
pub async fn directory(
    State(state): State<BastionState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Json<Directory> {
    let base = match &state.public_url {
        Some(url) => url.to_string(),
        None => request_base(&uri, &headers),
    };
    Json(state.endpoints.rebased(&base))
}

/// Where the bastion is mounted, as seen by a request to its directory.
///
/// Falls back to the bare mount path when neither the URI nor the headers
/// name an authority.
fn request_base(uri: &Uri, headers: &HeaderMap) -> String {
    let mount = uri.path().strip_suffix(DIRECTORY_ROUTE).unwrap_or_default();
    let authority = uri
        .authority()
        .map(|authority| authority.as_str())
        .or_else(|| headers.get(HOST).and_then(|value| value.to_str().ok()));

    match authority {
        Some(authority) => {
            let scheme = uri
                .scheme_str()
                .or_else(|| {
                    headers
                        .get("x-forwarded-proto")
                        .and_then(|value| value.to_str().ok())
                })
                .unwrap_or("http");
            format!("{scheme}://{authority}{mount}")
        }
        None => mount.to_string(),
    }
}
