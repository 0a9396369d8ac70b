use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse, BasicTokenType};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use url::{Host, Url};

use crate::auth::callback::CallbackListener;
use crate::auth::now_epoch;
use crate::auth::token_store::TokenRecord;
use crate::config::{Credentials, Settings};
use crate::error::{AuthError, ConfigError};

/// Listener port when the redirect URI names none, as in Google's
/// desktop-app credentials (`http://localhost`).
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// Authorization-code grant with PKCE and a loopback redirect.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    client_id: String,
    client_secret: Option<String>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_uri: String,
    scopes: Vec<String>,
    callback_timeout: Duration,
}

impl AuthFlow {
    pub fn new(creds: &Credentials, settings: &Settings) -> Result<Self, ConfigError> {
        let auth_url = AuthUrl::new(creds.auth_url.clone()).map_err(|source| {
            ConfigError::InvalidUrl {
                url: creds.auth_url.clone(),
                source,
            }
        })?;
        let token_url = TokenUrl::new(creds.token_url.clone()).map_err(|source| {
            ConfigError::InvalidUrl {
                url: creds.token_url.clone(),
                source,
            }
        })?;

        Ok(Self {
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            auth_url,
            token_url,
            redirect_uri: creds.redirect_uri(settings.redirect_uri.as_deref()),
            scopes: settings.scopes.clone(),
            callback_timeout: settings.callback_timeout(),
        })
    }

    fn client(&self) -> BasicClient {
        BasicClient::new(
            ClientId::new(self.client_id.clone()),
            self.client_secret.clone().map(ClientSecret::new),
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        )
    }

    /// Run the interactive flow.
    ///
    /// `user_agent` receives the authorization URL once the callback listener
    /// is up; it is expected to get a browser there (see [`present_authorization_url`]).
    /// The listener is closed before this returns, whatever the outcome.
    pub fn run<F>(&self, user_agent: F) -> Result<TokenRecord, AuthError>
    where
        F: FnOnce(&Url),
    {
        let mut redirect = self.callback_redirect()?;
        let bind_addr = loopback_addr(&redirect)?;

        // Listen first so the redirect can't race the bind
        let listener = CallbackListener::bind(bind_addr)?;
        if bind_addr.port() == 0 {
            let _ = redirect.set_port(Some(listener.local_addr().port()));
        }

        let client = self.client().set_redirect_uri(RedirectUrl::from_url(redirect));
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        user_agent(&auth_url);

        let code = listener
            .wait(self.callback_timeout)?
            .into_code(csrf_token.secret())?;
        log::info!("authorization code received, exchanging for token");

        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request(http_client)
            .map_err(exchange_error)?;

        Ok(record_from_response(&token, None))
    }

    /// The redirect URI with an explicit port, defaulting to [`DEFAULT_CALLBACK_PORT`].
    fn callback_redirect(&self) -> Result<Url, AuthError> {
        let invalid = |reason: String| AuthError::InvalidRedirect {
            uri: self.redirect_uri.clone(),
            reason,
        };
        let mut redirect = Url::parse(&self.redirect_uri).map_err(|e| invalid(e.to_string()))?;
        if redirect.port().is_none() {
            redirect
                .set_port(Some(DEFAULT_CALLBACK_PORT))
                .map_err(|()| invalid("cannot carry a port".to_string()))?;
        }
        Ok(redirect)
    }

    /// Trade the record's refresh token for a fresh access token.
    pub fn refresh(&self, token: &TokenRecord) -> Result<TokenRecord, AuthError> {
        let refresh = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self
            .client()
            .exchange_refresh_token(&RefreshToken::new(refresh.to_string()))
            .request(http_client)
            .map_err(exchange_error)?;

        Ok(record_from_response(&response, Some(refresh)))
    }
}

/// Default user agent: print the URL and try to open the system browser.
pub fn present_authorization_url(url: &Url, open_browser: bool) {
    println!("Go to the following link in your browser:\n{url}");
    // best-effort: the printed link is enough
    if open_browser && let Err(e) = open::that(url.as_str()) {
        log::warn!("could not open browser automatically: {e}");
    }
}

/// Socket address the redirect URI points at. Only loopback-style hosts are accepted.
fn loopback_addr(redirect: &Url) -> Result<SocketAddr, AuthError> {
    let invalid = |reason: &str| AuthError::InvalidRedirect {
        uri: redirect.to_string(),
        reason: reason.to_string(),
    };

    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| invalid("missing or unknown port"))?;

    let ip = match redirect.host() {
        Some(Host::Domain("localhost")) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
        Some(Host::Domain(_)) => return Err(invalid("host must be localhost or an IP address")),
        None => return Err(invalid("missing host")),
    };

    Ok(SocketAddr::new(ip, port))
}

fn record_from_response(token: &BasicTokenResponse, previous_refresh: Option<&str>) -> TokenRecord {
    let token_type = match token.token_type() {
        BasicTokenType::Bearer => "Bearer".to_string(),
        other => format!("{other:?}"),
    };

    TokenRecord {
        access_token: token.access_token().secret().to_string(),
        token_type,
        refresh_token: token
            .refresh_token()
            .map(|r| r.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at_epoch: token
            .expires_in()
            .map(|d| now_epoch() + d.as_secs() as i64),
    }
}

fn exchange_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    log::debug!("token endpoint error: {err:#?}");
    let message = match &err {
        RequestTokenError::ServerResponse(resp) => resp.to_string(),
        RequestTokenError::Parse(e, body) => {
            format!("unparsable response ({e}): {}", String::from_utf8_lossy(body))
        }
        other => other.to_string(),
    };
    AuthError::Exchange(message)
}
