// Interactive OAuth consent flow, run on a background task
// Author: kelexine (https://github.com/kelexine)

use super::capture::{AuthorizationCapture, CaptureReceiver};
use super::{unix_now, ClientIdentity, CredentialStore, TokenEndpoint, TokenState};
use crate::config::ServerConfig;
use crate::error::{RelayError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Everything the operator's browser round-trip depends on.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL the operator opens.
    pub url: String,
    /// Anti-forgery value Google must echo back.
    pub state: String,
    /// Redirect URI, repeated verbatim in the code exchange.
    pub redirect_uri: String,
    /// PKCE verifier when a challenge was sent.
    pub code_verifier: Option<String>,
}

impl AuthorizationRequest {
    /// Build the consent URL for `identity` from the server settings.
    pub fn build(identity: &ClientIdentity, config: &ServerConfig) -> Result<Self> {
        let state = generate_state()?;
        let redirect_uri = config.redirect_uri();
        let code_verifier = if config.use_pkce {
            Some(generate_code_verifier()?)
        } else {
            None
        };

        let separator = if identity.auth_uri.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}response_type=code&scope={}&redirect_uri={}&client_id={}&state={}&login_hint={}&access_type=offline&prompt=consent",
            identity.auth_uri,
            separator,
            urlencoding::encode(&config.oauth_scope),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&identity.client_id),
            urlencoding::encode(&state),
            urlencoding::encode(&config.email),
        );

        if let Some(verifier) = &code_verifier {
            url.push_str(&format!(
                "&code_challenge={}&code_challenge_method=S256",
                generate_code_challenge(verifier)
            ));
        }

        Ok(Self {
            url,
            state,
            redirect_uri,
            code_verifier,
        })
    }
}

/// Drives consent and the first code exchange.
pub struct AuthorizationFlow {
    request: AuthorizationRequest,
    receiver: CaptureReceiver,
    endpoint: TokenEndpoint,
    store: CredentialStore,
    wait_timeout: Duration,
    open_browser: bool,
}

impl AuthorizationFlow {
    pub fn new(
        request: AuthorizationRequest,
        receiver: CaptureReceiver,
        endpoint: TokenEndpoint,
        store: CredentialStore,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            request,
            receiver,
            endpoint,
            store,
            wait_timeout,
            open_browser: false,
        }
    }

    /// Also try to open the consent URL in the local browser.
    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Run to completion. Any error is fatal to the process: without a first
    /// grant there is nothing to refresh.
    pub async fn run(self) -> Result<()> {
        info!("Visit this URL to authenticate: {}", self.request.url);

        if self.open_browser {
            if let Err(e) = open::that(&self.request.url) {
                warn!("Could not open browser automatically: {}", e);
            }
        }

        info!(
            "Waiting up to {}s for the OAuth redirect",
            self.wait_timeout.as_secs()
        );
        let capture = self.receiver.wait(self.wait_timeout).await?;
        let code = verify_capture(capture, &self.request.state)?;

        debug!("Received authorization code, exchanging for tokens...");
        let grant = self
            .endpoint
            .exchange_code(
                &code,
                &self.request.redirect_uri,
                self.request.code_verifier.as_deref(),
            )
            .await
            .inspect_err(|e| error!("Failed to get tokens: {}", e))?;

        let refresh_token = grant.refresh_token.clone().ok_or_else(|| {
            RelayError::TokenExchange(
                "Response carried no refresh_token; revoke the app's access and retry".to_string(),
            )
        })?;

        info!("{}", refresh_token_hint(&refresh_token));

        self.store
            .set_tokens(TokenState::issued(
                grant.access_token.clone(),
                refresh_token,
                grant.expires_in,
                unix_now(),
            ))
            .await;
        crate::metrics::update_oauth_expiry(grant.expires_in);

        info!("OAuth authorization complete");
        Ok(())
    }
}

/// Operator instruction for skipping consent on the next start. The token is
/// printed whole; a masked value could not be copied into the config.
pub fn refresh_token_hint(refresh_token: &str) -> String {
    format!(
        "Set server.google_oauth2_token to \"{}\" to skip this step next time",
        refresh_token
    )
}

/// Check the redirect and pull out the code.
pub fn verify_capture(capture: AuthorizationCapture, expected_state: &str) -> Result<String> {
    if let Some(err) = capture.error {
        return Err(RelayError::TokenExchange(format!(
            "Authorization denied: {}",
            err
        )));
    }

    if capture.state.as_deref() != Some(expected_state) {
        return Err(RelayError::TokenExchange(
            "CSRF state mismatch - possible security issue".to_string(),
        ));
    }

    match capture.code {
        Some(code) if !code.is_empty() => Ok(code),
        _ => Err(RelayError::TokenExchange(
            "Missing code in OAuth redirect".to_string(),
        )),
    }
}

fn random_bytes() -> Result<[u8; 32]> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes)
        .map_err(|_| RelayError::Internal("Failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// Generate random state for CSRF protection
fn generate_state() -> Result<String> {
    Ok(hex::encode(random_bytes()?))
}

/// Generate a random code verifier for PKCE
fn generate_code_verifier() -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes()?))
}

/// Generate code challenge from verifier (SHA256)
fn generate_code_challenge(verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
