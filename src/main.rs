//! Service entry point

use tourbook::config::Config;
use tourbook::error::set_error_exposure;
use tourbook::observability::init_tracing;
use tourbook::routes::api_router;
use tourbook::server::Server;
use tourbook::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    // Internal error detail only leaves the process outside production
    set_error_exposure(!config.is_production());

    let state = AppState::new(config.clone())?;
    let app = api_router(state);

    Server::new(config).serve(app).await?;

    Ok(())
}
