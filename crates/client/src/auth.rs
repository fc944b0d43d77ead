//! Session helpers over the executor.

use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::request::RequestOptions;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const ME_PATH: &str = "/api/auth/me";

/// Exchange a pass code for a token and store it.
///
/// Sent without credentials. The returned payload is passed through as-is;
/// when it carries `token` that value becomes the stored credential, which
/// also clears the response cache.
pub async fn login(client: &ApiClient, pass_code: &str) -> Result<Value, ApiError> {
    let options = RequestOptions::post(json!({ "passCode": pass_code })).anonymous();
    let payload = client.execute(LOGIN_PATH, options).await?;

    match payload.get("token").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => {
            if let Err(e) = client.set_token(token).await {
                tracing::warn!(error = %e, "failed to persist token");
            }
            tracing::info!("logged in");
        }
        _ => tracing::warn!("login response carried no token"),
    }

    Ok(payload)
}

/// The signed-in user.
pub async fn me(client: &ApiClient) -> Result<Value, ApiError> {
    client.execute(ME_PATH, RequestOptions::get()).await
}

/// Forget the stored credential. Local only; nothing is sent.
pub async fn logout(client: &ApiClient) -> Result<(), shiftdesk_core::Error> {
    client.clear_token().await?;
    tracing::info!("logged out");
    Ok(())
}
