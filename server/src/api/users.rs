//! Profile enrichment via `users.get`.
//!
//! Best-effort: runs as a post-authentication callback, so every failure is
//! logged and swallowed rather than surfaced to a request.

use serde::Deserialize;
use tracing::{error, info};

use super::{mask_token, ApiError, VkApi};
use crate::db::User;
use crate::domain::UserRepo;

/// Profile fields of a `users.get` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VkUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub can_access_closed: bool,
    pub is_closed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsersGetResponse {
    response: Vec<VkUser>,
    error: ApiError,
}

impl VkApi {
    /// Fetch the user's profile with their own token and persist the result.
    pub async fn fill_user(&self, repo: &dyn UserRepo, user: &mut User) {
        let url = format!(
            "{}/users.get?access_token={}&v={}",
            self.cfg.endpoint, user.token, self.cfg.version
        );

        let body = match self.client.get(&url).await {
            Ok(body) => body,
            Err(e) => {
                error!(
                    api = "users.get",
                    token = %mask_token(&user.token),
                    error = %e,
                    "Send API request error"
                );
                return;
            }
        };

        let parsed: UsersGetResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(api = "users.get", error = %e, "Unmarshalling response error");
                return;
            }
        };

        if parsed.error.error_code > 0 {
            error!(
                api = "users.get",
                code = parsed.error.error_code,
                message = %parsed.error.error_msg,
                "Response has an error"
            );
            return;
        }

        let Some(profile) = parsed.response.first() else {
            error!(api = "users.get", "Response carries no profiles");
            return;
        };

        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();

        if let Err(e) = repo.update(user).await {
            error!(api = "users.get", error = %e, "Update user info error");
            return;
        }

        info!(
            api = "users.get",
            external_id = %user.external_id,
            "Profile enrichment completed"
        );
    }
}
