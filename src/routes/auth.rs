// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webex OIDC login routes (authorization code + PKCE).

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, SESSION_COOKIE};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Cookie holding the PKCE verifier between /auth/login and /auth/callback.
const VERIFIER_COOKIE: &str = "oidc_verifier";

const PKCE_VERIFIER_LEN: usize = 64;

/// Scopes requested for login; calling data access itself goes through the
/// service app credential, not the user token.
const LOGIN_SCOPE: &str = "openid email profile phone address";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", get(auth_login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", get(auth_logout))
}

/// Start the OIDC flow: clear any existing session, stash the PKCE verifier
/// in a cookie, and redirect to the Webex authorize endpoint.
async fn auth_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let verifier = random_string(PKCE_VERIFIER_LEN);
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

    let oauth_state = sign_state(&state.config.frontend_url, &state.config.session_signing_key)?;

    let authorize_url = format!(
        "{}/authorize?\
         response_type=code&\
         client_id={}&\
         redirect_uri={}&\
         scope={}&\
         state={}&\
         code_challenge={}&\
         code_challenge_method=S256",
        state.config.auth_base_url,
        state.config.oidc_client_id,
        urlencoding::encode(&state.config.redirect_url),
        urlencoding::encode(LOGIN_SCOPE),
        oauth_state,
        challenge,
    );

    tracing::info!(
        client_id = %state.config.oidc_client_id,
        "Starting OIDC login, redirecting to Webex"
    );

    let jar = jar
        .remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
        .add(
            Cookie::build((VERIFIER_COOKIE, verifier))
                .path("/auth")
                .http_only(true)
                .build(),
        );

    Ok((jar, Redirect::temporary(&authorize_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Token response from the authorization code exchange.
#[derive(Deserialize)]
struct LoginTokenResponse {
    access_token: String,
}

/// OIDC redirect URI: exchange the code, resolve the calling user, create
/// the session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = verify_and_decode_state(&params.state, &state.config.session_signing_key)
        .unwrap_or_else(|| {
            tracing::warn!("Invalid or tampered state parameter, using default frontend URL");
            state.config.frontend_url.clone()
        });

    // Drop the one-shot verifier cookie no matter how the callback ends.
    let verifier = jar
        .get(VERIFIER_COOKIE)
        .map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build((VERIFIER_COOKIE, "")).path("/auth").build());

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OIDC error from Webex");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;
    let verifier = verifier
        .ok_or_else(|| AppError::BadRequest("missing PKCE verifier cookie".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let login_token = exchange_code(&state, &code, &verifier).await?;

    // The ID token is not consulted; the userinfo endpoint is the source of
    // the login identity.
    let userinfo = state.webex.userinfo(&login_token.access_token).await?;
    tracing::info!(email = %userinfo.email, "Got userinfo, resolving calling user");

    let user = match state.webex.find_calling_user(&userinfo.email).await? {
        Some(user) => user,
        None => {
            tracing::warn!(email = %userinfo.email, "Not a calling user of the target org");
            let redirect = format!("{}?error=not_a_calling_user", frontend_url);
            return Ok((jar, Redirect::temporary(&redirect)));
        }
    };

    let jwt = create_session_jwt(&user, &state.config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("session JWT creation failed: {}", e)))?;

    tracing::info!(
        person_id = %user.person_id,
        display_name = %user.display_name,
        "Login successful"
    );

    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, jwt))
            .path("/")
            .http_only(true)
            .build(),
    );

    Ok((jar, Redirect::temporary(&frontend_url)))
}

/// Logout - clear the session cookie.
async fn auth_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::temporary(&state.config.frontend_url))
}

/// Exchange the authorization code at the Webex token endpoint.
async fn exchange_code(
    state: &Arc<AppState>,
    code: &str,
    verifier: &str,
) -> Result<LoginTokenResponse> {
    let response = reqwest::Client::new()
        .post(format!("{}/access_token", state.config.auth_base_url))
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", state.config.oidc_client_id.as_str()),
            ("client_secret", state.config.oidc_client_secret.as_str()),
            ("code", code),
            ("redirect_uri", state.config.redirect_url.as_str()),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .map_err(|e| AppError::UpstreamAuth(format!("code exchange failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Code exchange failed");
        return Err(AppError::UpstreamAuth(format!(
            "code exchange failed with status {}",
            status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::UpstreamAuth(format!("invalid token response: {}", e)))
}

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Build the signed OAuth state parameter: "frontend_url|timestamp_hex"
/// with an HMAC-SHA256 signature appended, base64url-encoded as a whole.
fn sign_state(frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the frontend URL from the OAuth
/// state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}
