use dotenvy::dotenv;
use storefront_checkout::config::AppConfig;
use storefront_checkout::{build_server, AppState, Ports, StartupError};

fn startup(e: impl Into<StartupError>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.into().to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup)?;
    let ports = Ports::from_config(&config).map_err(startup)?;
    let state = AppState::new(&config, ports);

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
