use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use leadline_api::config::ApiConfig;
use leadline_api::helpers::audit::TracingAuditSink;
use leadline_api::helpers::clock::SystemClock;
use leadline_api::helpers::notifier::BroadcastNotifier;
use leadline_api::helpers::storage::LocalStorage;
use leadline_api::{handlers, helpers, Database, Engine};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::prelude::*;

#[get("/health")]
async fn health(db: web::Data<Arc<Database>>) -> impl Responder {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "unhealthy",
                "database": "disconnected"
            }))
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = args.log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("leadline-api.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Load config
    let (config, config_path) = ApiConfig::load()?;
    tracing::info!("Config loaded from {:?}", config_path);

    // Initialize database
    let (db, db_path) = helpers::database::initialize_database(&config)?;
    tracing::info!("Database initialized at {:?}", db_path);

    let recordings_dir = helpers::database::get_recordings_dir(&config)?;
    std::fs::create_dir_all(&recordings_dir)?;
    tracing::info!("Recordings stored under {:?}", recordings_dir);

    let notifier = Arc::new(BroadcastNotifier::new(256));
    let engine = Arc::new(Engine::new(
        db.async_connection.clone(),
        &config,
        Arc::new(SystemClock),
        Arc::new(LocalStorage::new(recordings_dir)),
        notifier.clone(),
        Arc::new(TracingAuditSink),
    ));

    // Relay contact notices until something else subscribes for real-time delivery
    let mut notices = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => tracing::info!(
                    target: "notices",
                    contact_id = notice.contact_id,
                    status = notice.status.as_str(),
                    assigned_agent_id = ?notice.assigned_agent_id,
                    kind = ?notice.kind,
                    "contact notice"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notice relay lagged, {} notices skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let host = config.server.host.clone();
    let port = config.server.port;
    tracing::info!("Starting server on {}:{}", host, port);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = if let Some(cors_config) = &cors_config {
            let mut cors_builder = Cors::default();
            for origin in &cors_config.allowed_origins {
                cors_builder = cors_builder.allowed_origin(origin);
            }
            cors_builder
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .max_age(3600)
        } else {
            Cors::default()
                .allow_any_origin()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(engine.clone()))
            .service(health)
            .configure(handlers::routes)
    })
    .bind((host.as_str(), port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        handle.stop(true).await;
    });

    server.await?;
    Ok(())
}
