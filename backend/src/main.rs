use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use plant_disease_api::config::AppConfig;
use plant_disease_api::inference::{Classifier, TorchModel};
use plant_disease_api::routes::{configure_routes, UploadLimit};
use tch::Device;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    log::info!("Configuration: {:?}", config);

    let device = if config.use_cuda {
        Device::cuda_if_available()
    } else {
        Device::Cpu
    };

    let model = TorchModel::load(&config.model_path, device).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    let classifier: Arc<dyn Classifier> = Arc::new(model);
    let classifier = web::Data::from(classifier);
    let upload_limit = UploadLimit(config.max_upload_bytes);

    let bind_address = config.bind_address();
    log::info!(
        "Starting server on {} with {} worker(s)",
        bind_address,
        config.workers
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(classifier.clone())
            .configure(|cfg| configure_routes(cfg, upload_limit))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
