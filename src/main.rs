use log::info;
use solar_dashboard::config::AppConfig;
use solar_dashboard::routes;
use solar_dashboard::state::AppState;
use solar_dashboard::BoxError;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize the logger
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env()?;
    info!(
        "Using PORT: {}, storage: {:?}, worksheet: '{}'",
        config.port, config.storage, config.worksheet
    );

    let state = Arc::new(AppState::from_config(&config)?);

    // Bind to 0.0.0.0 so the dashboard is reachable from the container host
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", routes::SESSION_HEADER])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    let api = routes::routes(state).with(cors).with(warp::log("solar_dashboard"));
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
