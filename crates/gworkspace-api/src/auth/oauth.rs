//! OAuth 2.0 authorization-code flow with PKCE and a loopback redirect.
//!
//! 1. Generate a code verifier, its S256 challenge and a random state.
//! 2. Bind a listener on `127.0.0.1` within the configured port range.
//! 3. Open the consent page in the browser (or print the URL).
//! 4. Read the redirect, check the state, and exchange the code for tokens.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;
use crate::error::{ApiError, ApiResult};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
<html><body><h1>gworkspace is authorized</h1><p>You can close this window.</p></body></html>";

const CALLBACK_FAILED: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
<html><body><h1>Authorization failed</h1><p>Check the terminal for details.</p></body></html>";

/// Talks to Google's authorization and token endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

/// A successful token-endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Granted scopes, falling back to `requested` when Google omits them.
    fn granted_scopes(&self, requested: &[String]) -> Vec<String> {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(String::from).collect()
            }
            _ => requested.to_vec(),
        }
    }
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive consent flow and returns fresh tokens.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ApiResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.auth_url(&self.credentials.client_id, &redirect_uri, scopes)?;

        info!("opening browser for Google consent");
        debug!(%auth_url, "authorization URL");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| ApiError::authentication("timed out waiting for OAuth callback"))??;

        if callback.state != pkce.state {
            return Err(ApiError::authentication(
                "OAuth state mismatch, refusing the callback",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let response = self.token_request(&params, "token exchange").await?;

        let scopes = response.granted_scopes(scopes);
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        ))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenResponse> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.token_request(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(response)
    }

    async fn token_request(&self, params: &[(&str, &str)], what: &str) -> ApiResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ApiError::network(format!("{} request failed: {}", what, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("failed to read {} response: {}", what, e)).with_source(e)
        })?;

        if !status.is_success() {
            return Err(ApiError::authentication(format!(
                "{} failed ({}): {}",
                what,
                status,
                body.trim()
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!("invalid {} response: {}", what, e)).with_source(e)
        })
    }
}

async fn bind_loopback(port_range: (u16, u16)) -> ApiResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!(port, "bound loopback listener");
            return Ok((listener, port));
        }
    }
    Err(ApiError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Accepts connections until one carries the OAuth redirect.
///
/// Unrelated requests (favicon and the like) are ignored.
async fn wait_for_callback(listener: &TcpListener) -> ApiResult<Callback> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| {
            ApiError::internal(format!("failed to accept callback: {}", e)).with_source(e)
        })?;
        debug!(%peer, "callback connection");
        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

async fn handle_connection(mut stream: TcpStream) -> Option<ApiResult<Callback>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader.read_line(&mut request_line).await.ok()?;
    }

    let result = parse_callback(&request_line)?;
    let page = if result.is_ok() {
        CALLBACK_OK
    } else {
        CALLBACK_FAILED
    };
    if let Err(e) = stream.write_all(page.as_bytes()).await {
        warn!("failed to answer browser: {}", e);
    }
    let _ = stream.shutdown().await;
    Some(result)
}

/// The code and state carried by the OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Parses the request line of the redirect, e.g.
/// `GET /callback?code=...&state=... HTTP/1.1`.
///
/// Returns `None` when the request is not for `/callback`.
fn parse_callback(request_line: &str) -> Option<ApiResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(match (error, code) {
        (Some(error), _) => Err(ApiError::authentication(format!(
            "authorization denied: {}",
            error
        ))),
        (None, Some(code)) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        (None, None) => Err(ApiError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// RFC 7636 verifier, challenge and CSRF state for one consent attempt.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Builds the consent URL requesting offline access to `scopes`.
    pub fn auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> ApiResult<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            GOOGLE_AUTH_URL,
            [
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| ApiError::internal(format!("failed to build authorization URL: {}", e)))
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
