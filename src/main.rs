use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, Result};
use log::info;

use forex_track::{api::AppState, config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let pool = db::connect(&config).await?;
    let state = web::Data::new(AppState::new(pool));

    info!("Server started at {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(forex_track::api::configure)
    })
    .bind(&config.bind_address)
    .with_context(|| format!("Can't bind to {}", config.bind_address))?
    .run()
    .await?;

    Ok(())
}
