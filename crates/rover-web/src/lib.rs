//! # rover-web
//!
//! Captive configuration portal served while the rover runs its setup
//! access point.
//!
//! This crate provides:
//! - `GET /` - a minimal HTML form asking for SSID and passphrase
//! - `POST /save` - persists the submitted credentials and hands them to
//!   the network lifecycle controller through shared state
//! - a catch-all redirect to `/`, so OS captive-portal probes land on the
//!   form
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rover_web::{create_router, PortalState};
//!
//! let state = PortalState::new(credentials, store, display);
//! let app = create_router(state);
//!
//! let listener = TcpListener::bind("0.0.0.0:80").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use rover_core::{CredentialStore, StatusDisplay, WifiCredentials};

const PORTAL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Rover32 Setup</title>
<style>
body { font-family: sans-serif; max-width: 24em; margin: 2em auto; padding: 0 1em; }
input { display: block; width: 100%; margin: 0.5em 0 1em; padding: 0.5em; }
button { padding: 0.5em 2em; }
</style>
</head>
<body>
<h1>Rover32 Setup</h1>
<p>Enter the WiFi network the rover should join.</p>
<form method="post" action="/save">
<label for="ssid">Network name</label>
<input id="ssid" name="ssid" maxlength="31" required>
<label for="password">Password</label>
<input id="password" name="password" type="password" maxlength="63">
<button type="submit">Save</button>
</form>
</body>
</html>"#;

const SAVED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta name="viewport" content="width=device-width, initial-scale=1">
<title>Rover32 Setup</title></head>
<body style="font-family: sans-serif; max-width: 24em; margin: 2em auto;">
<h1>Saved</h1>
<p>Credentials stored. The rover is now trying to join the network;
the setup access point will disappear once it connects.</p>
</body>
</html>"#;

/// Shared state for all portal handlers.
///
/// `credentials` is the same handle the network lifecycle controller
/// watches, so a successful save takes effect on its next tick.
#[derive(Clone)]
pub struct PortalState {
    credentials: Arc<RwLock<WifiCredentials>>,
    store: Arc<dyn CredentialStore>,
    display: Arc<dyn StatusDisplay>,
}

impl PortalState {
    pub fn new(
        credentials: Arc<RwLock<WifiCredentials>>,
        store: Arc<dyn CredentialStore>,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            credentials,
            store,
            display,
        }
    }
}

/// Form body of `POST /save`.
#[derive(Debug, Deserialize)]
pub struct SaveForm {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

/// Create the portal router.
///
/// Every unknown path redirects to `/`: captive-portal detection probes
/// (`/generate_204`, `/hotspot-detect.html`, ...) must reach the form.
pub fn create_router(state: PortalState) -> Router {
    Router::new()
        .route("/", get(portal_page))
        .route("/save", post(save_credentials))
        .fallback(redirect_to_portal)
        .with_state(state)
}

/// GET /
///
/// The page must never be cached: phones re-open captive portals from
/// cache otherwise and show a stale form after provisioning.
async fn portal_page() -> Response {
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
        ],
        Html(PORTAL_PAGE),
    )
        .into_response()
}

/// POST /save
async fn save_credentials(
    State(state): State<PortalState>,
    Form(form): Form<SaveForm>,
) -> Response {
    let ssid = form.ssid.trim();
    if ssid.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html("<p>Network name must not be empty.</p>"),
        )
            .into_response();
    }

    let credentials = WifiCredentials::new(ssid, &form.password);
    if let Err(e) = state.store.save(&credentials) {
        warn!("failed to persist portal credentials: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<p>Could not store the credentials, please try again.</p>"),
        )
            .into_response();
    }

    info!(ssid = %credentials.ssid, "portal received new credentials");
    state.display.show("Credentials saved");

    // Hand the pair to the lifecycle controller last, after persistence
    // succeeded, so a reboot never loses what the controller already uses.
    match state.credentials.write() {
        Ok(mut shared) => *shared = credentials,
        Err(_) => {
            warn!("credential handle poisoned, restart required");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    Html(SAVED_PAGE).into_response()
}

/// Catch-all: plain 302 to `/`. Some captive-portal probes do not follow
/// 307/308, so the status is explicit.
async fn redirect_to_portal() -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, HeaderValue::from_static("/"))],
    )
        .into_response()
}
