use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;

pub fn issue_token(settings: &Settings, user_id: Uuid) -> Result<String> {
    let token = settings.verifier()?.issue(user_id)?;
    info!(
        "Issued token for user {} valid for {} hours",
        user_id, settings.token_ttl_hours
    );
    Ok(token)
}
