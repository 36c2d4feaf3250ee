use actix_cors::Cors;
use actix_web::{
    get,
    middleware::{from_fn, Logger},
    web, App, HttpResponse, HttpServer,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::{
    api::error,
    configs::UploadLimits,
    constants::{Env, REQUEST_ID_HEADER},
    middlewares::{cleanup_uploads, request_id, translate_upload_errors},
    modules::upload::Intake,
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;

#[get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

async fn route_not_found() -> Result<HttpResponse, error::Error> {
    Err(error::Error::not_found("Route not found"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let env = Env::load().map_err(|e| std::io::Error::other(e.to_string()))?;
    tracing::info!("Environment variables loaded");

    let temp_dir = env.temp_dir();
    configs::ensure_temp_dir(&temp_dir).await;
    configs::spawn_sweeper(
        temp_dir.clone(),
        Duration::from_secs(env.temp_file_ttl_secs),
        Duration::from_secs(env.sweep_interval_secs),
    );

    let intake = web::Data::new(Intake::new(UploadLimits::from_env(&env), temp_dir));
    let frontend_url = env.frontend_url.clone();

    tracing::info!("Starting server at http://{}:{}", env.ip, env.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .expose_headers([REQUEST_ID_HEADER])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(from_fn(translate_upload_errors))
            .wrap(from_fn(cleanup_uploads))
            .wrap(from_fn(request_id))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(intake.clone())
            .service(health_check)
            .service(web::scope("/api").configure(modules::upload::route::configure))
            .default_service(web::to(route_not_found))
    })
    .bind((env.ip.as_str(), env.port))?
    .workers(2)
    .run()
    .await
}
