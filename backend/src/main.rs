mod classifier;
mod correction;
mod eval;
mod ingest;
mod routes;
mod session;
mod storage;

use std::env;
use std::fs;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;

use classifier::registry::{DEFAULT_MODEL, ModelRegistry};
use routes::configure_routes;
use session::SessionState;
use storage::blob_store::S3BlobStore;
use storage::correction_log::CorrectionLog;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    // The storage credential arrives as a blob from the secret store; the
    // SDK reads credentials from a file, so materialize it before the client
    // is built.
    if let Ok(blob) = env::var("STORAGE_CREDENTIALS") {
        let path =
            env::var("STORAGE_CREDENTIALS_FILE").unwrap_or_else(|_| "credentials".to_string());
        fs::write(&path, blob)?;
        // Single-threaded at this point; nothing else reads the environment.
        unsafe {
            env::set_var("AWS_SHARED_CREDENTIALS_FILE", &path);
        }
        log::info!("storage credentials written to {path}");
    }

    let frontend_dir = env::var("FRONTEND_DIR").unwrap_or_else(|_| "static".to_string());
    let model_dir = env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string());
    let bucket =
        env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "dashboardhoax-bucket".to_string());

    let registry = web::Data::new(ModelRegistry::new(model_dir));
    let state = web::Data::new(SessionState::new(DEFAULT_MODEL));

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let s3_client = S3Client::new(&aws_config);
    let store = Arc::new(S3BlobStore::new(s3_client, bucket.clone()));
    let corrections = web::Data::new(CorrectionLog::new(store));

    log::info!("correction log: s3://{bucket}/{}", corrections.object());

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{port}");
    log::info!("Starting server on {bind_address}");

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(registry.clone())
            .app_data(state.clone())
            .app_data(corrections.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
