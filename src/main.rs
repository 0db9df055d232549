use actix_web::web;
use dotenvy::dotenv;
use order_core::config::AppConfig;
use order_core::state::build_sweep;
use order_core::{build_server, create_pool, run_migrations, AppState};
use tokio::sync::watch;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    run_migrations(&pool)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep = build_sweep(pool.clone(), config.sweep).spawn(shutdown_rx);

    let state = web::Data::new(AppState::new(pool));

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let served = build_server(state, &config.host, config.port)?.await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweep.await {
        log::error!("timeout sweep task ended abnormally: {}", e);
    }

    served?;
    Ok(())
}
