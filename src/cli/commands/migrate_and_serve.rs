use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::run_migrations;
use super::serve::serve_with_state;
use crate::config::{Settings, initialize_app_state};

pub async fn migrate_and_serve(settings: &Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Settings: {:?}", settings);

    let state = match initialize_app_state(settings).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_migrations(&state.db).await?;
    serve_with_state(state, settings).await
}
