//! # Chat Backend
//!
//! One binary, three services. `SERVER_ROLE` (or `role` in the config
//! files) selects which one this process runs:
//! - `gateway`: HTTP login, credential check and chat server handoff
//! - `directory`: chat server selection and login token issue/validation
//! - `chat`: the framed TCP chat server

use anyhow::Result;
use tracing::info;

use chat_backend::config::Settings;
use chat_backend::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chat_backend::telemetry::init_tracing();

    let settings = Settings::load()?;
    info!(
        role = %settings.role,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;
    application.run_until_stopped().await?;

    Ok(())
}
