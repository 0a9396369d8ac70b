use crate::auth::now_epoch;
use crate::auth::oauth::{AuthFlow, present_authorization_url};
use crate::auth::token_store::{TokenRecord, TokenStore};
use crate::config::{Credentials, Settings};
use crate::error::{AuthError, Result, TokenStoreError};

/// Ties the authorization flow to the token file.
pub struct TokenManager {
    flow: AuthFlow,
    store: TokenStore,
    open_browser: bool,
}

impl TokenManager {
    pub fn new(flow: AuthFlow, store: TokenStore, open_browser: bool) -> Self {
        Self {
            flow,
            store,
            open_browser,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let creds = Credentials::load(&settings.credentials_path)?;
        let flow = AuthFlow::new(&creds, settings)?;
        Ok(Self::new(
            flow,
            TokenStore::new(&settings.token_path),
            settings.open_browser,
        ))
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Run the browser flow unconditionally and replace the stored token.
    pub fn create_token(&self) -> Result<TokenRecord> {
        let token = self.authorize()?;
        self.store.save(&token)?;
        Ok(token)
    }

    /// A usable token: stored if still valid, refreshed if expired,
    /// otherwise obtained through the browser flow.
    pub fn access_token(&self) -> Result<TokenRecord> {
        let stored = match self.store.load() {
            Ok(t) => t,
            Err(TokenStoreError::NotFound(path)) => {
                log::info!("no usable token at {}; starting authorization", path.display());
                return self.create_token();
            }
            Err(e) => return Err(e.into()),
        };

        if !stored.is_expired(now_epoch()) {
            return Ok(stored);
        }

        if stored.refresh_token.is_some() {
            match self.flow.refresh(&stored) {
                Ok(t) => {
                    log::info!("refreshed expired access token");
                    self.store.save(&t)?;
                    return Ok(t);
                }
                Err(e) => log::warn!("refresh failed ({e}); falling back to interactive authorization"),
            }
        } else {
            log::info!("stored token expired and has no refresh token");
        }

        self.create_token()
    }

    fn authorize(&self) -> std::result::Result<TokenRecord, AuthError> {
        let open_browser = self.open_browser;
        self.flow
            .run(|url| present_authorization_url(url, open_browser))
    }
}
