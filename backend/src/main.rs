use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use puppysense_backend::classify::ClassifyService;
use puppysense_backend::config::AppConfig;
use puppysense_backend::inference::TorchModel;
use puppysense_backend::routes::{UploadLimit, configure_routes};
use puppysense_backend::storage::S3Service;
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let model = TorchModel::load(&config.model_path).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;

    let mut service = ClassifyService::new(Arc::new(model), config.mode);

    if let Some(storage) = &config.storage {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(storage.region.clone()))
            .load()
            .await;
        let s3_service = S3Service::new(S3Client::new(&aws_config), storage);
        service = service.with_store(Arc::new(s3_service));
        log::info!("Uploads are stored in bucket {}", storage.bucket);
    }

    let limit = UploadLimit(config.max_upload_bytes);
    let bind_address = config.bind_address();
    log::info!(
        "Starting server on {} ({:?} responses)",
        bind_address,
        service.mode()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(service.clone()))
            .configure(|cfg| configure_routes(cfg, limit))
    })
    .bind(&bind_address)?
    .run()
    .await
}
