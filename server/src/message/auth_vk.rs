//! VK OAuth token-exchange flow.
//!
//! Sequential protocol with explicit failure exits: extract the authorization
//! code from the callback, trade it for an access token, reconcile the local
//! user record, then establish the session and respond. Post-authentication
//! callbacks run fire-and-forget after the response is written.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, warn};
use url::Url;

use super::Handler;
use crate::api::{self, mask_token, HttpClient};
use crate::config::{AuthResponse, VkOauthConfig};
use crate::db::{OauthProvider, User};
use crate::domain::{Event, PostAuthCallback, RepoError, ResponseWriter, UserRepo, COOKIE_NAME};
use crate::errors::{BotError, BotResult};

const OAUTH_LOG_KEY: &str = "VK";

/// Token endpoint answer: either a token payload or an error payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenResponse {
    access_token: String,
    user_id: i64,
    email: String,
    error: String,
    error_description: String,
}

/// VK OAuth flow handler.
pub struct AuthVk {
    cfg: VkOauthConfig,
    client: Arc<dyn HttpClient>,
    users: Arc<dyn UserRepo>,
    callbacks: Vec<PostAuthCallback>,
}

impl AuthVk {
    pub fn new(
        cfg: VkOauthConfig,
        client: Arc<dyn HttpClient>,
        users: Arc<dyn UserRepo>,
        callbacks: Vec<PostAuthCallback>,
    ) -> Self {
        Self {
            cfg,
            client,
            users,
            callbacks,
        }
    }

    /// Extract the authorization code from the callback query string.
    fn authorization_code(query: &str) -> BotResult<String> {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| BotError::Decode("authorization code missing from callback".into()))
    }

    /// Trade the authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> BotResult<TokenResponse> {
        let url = format!(
            "{}/access_token?client_id={}&client_secret={}&redirect_uri={}&code={}",
            self.cfg.oauth_endpoint,
            self.cfg.client_id,
            self.cfg.client_secret,
            self.cfg.redirect_uri,
            code
        );

        let body = self.client.get(&url).await.map_err(|e| {
            error!(
                oauth = OAUTH_LOG_KEY,
                secret = %mask_token(&self.cfg.client_secret),
                error = %e,
                "Send oauth token API request error"
            );
            BotError::Transport(e)
        })?;

        let token: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            error!(oauth = OAUTH_LOG_KEY, error = %e, "Unmarshalling oauth response error");
            BotError::Transport(e.into())
        })?;

        if !token.error.is_empty() {
            error!(
                oauth = OAUTH_LOG_KEY,
                description = %token.error_description,
                "could not authorize"
            );
            return Err(BotError::Oauth {
                code: token.error,
                description: token.error_description,
            });
        }

        Ok(token)
    }

    /// Match or create the local user record for this external identity.
    async fn reconcile(&self, token: &TokenResponse) -> BotResult<User> {
        let external_id = token.user_id.to_string();

        match self
            .users
            .get_by_external_id(OauthProvider::Vk, &external_id)
            .await
        {
            Ok(mut user) => {
                user.token = token.access_token.clone();
                // Non-fatal: the in-memory token is already current for the
                // rest of this request, so the session is still issued.
                if let Err(e) = self.users.update(&user).await {
                    warn!(oauth = OAUTH_LOG_KEY, error = %e, "Update user's token error");
                }
                Ok(user)
            }
            Err(RepoError::NotFound) => {
                let user = User::new(
                    OauthProvider::Vk,
                    external_id,
                    token.email.clone(),
                    token.access_token.clone(),
                );
                self.users.create(&user).await.map_err(|e| {
                    error!(oauth = OAUTH_LOG_KEY, error = %e, "could not create oauth user");
                    BotError::from(e)
                })?;
                info!(
                    oauth = OAUTH_LOG_KEY,
                    external_id = %user.external_id,
                    "created oauth user"
                );
                Ok(user)
            }
            Err(e) => {
                error!(oauth = OAUTH_LOG_KEY, error = %e, "could not find oauth user");
                Err(e.into())
            }
        }
    }

    /// The configured redirect URI with its path rewritten to the site root.
    /// The query string is kept as-is.
    fn redirect_target(&self) -> BotResult<Url> {
        let mut site = Url::parse(&self.cfg.redirect_uri)
            .map_err(|e| BotError::Decode(format!("could not build redirect url: {e}")))?;
        site.set_path("/");
        Ok(site)
    }
}

#[async_trait]
impl Handler for AuthVk {
    /// The registry key matches the configured callback route segment, so a
    /// matched OAuth route always resolves to this handler.
    fn name(&self) -> &str {
        &self.cfg.path
    }

    async fn exec(&self, event: &Event, out: &mut ResponseWriter) -> BotResult<()> {
        let query = event
            .oauth_query()
            .ok_or_else(|| BotError::Decode("not an oauth callback".into()))?;
        let code = Self::authorization_code(query)?;

        let token = self.exchange_code(&code).await?;
        let user = self.reconcile(&token).await?;

        // Fire-and-forget; callback outcomes never affect the response below.
        for callback in &self.callbacks {
            tokio::spawn(callback(user.clone()));
        }

        out.set_cookie(COOKIE_NAME, &user.token);
        match self.cfg.on_success {
            AuthResponse::Redirect => {
                let target = self.redirect_target()?;
                out.redirect(target.as_str());
            }
            AuthResponse::Ack => out.write(api::DEFAULT_RESPONSE),
        }

        Ok(())
    }
}
