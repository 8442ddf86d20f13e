mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lingo_api::intent::{DisabledClassifier, IntentClassifier, WitClassifier};
use lingo_api::translate::{DisabledTranslator, HttpTranslator, Translator};
use lingo_api::{AppState, AppStateInner, MessageDispatcher};
use lingo_gateway::Broadcaster;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lingo=debug,lingo_api=debug,lingo_gateway=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and uploads
    let db = Arc::new(lingo_db::Database::open(&config.db_path)?);
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Adapters
    let translator: Arc<dyn Translator> = match &config.translate_url {
        Some(url) => {
            info!("Translation via {}", url);
            Arc::new(HttpTranslator::new(
                url,
                config.translate_api_key.clone(),
                config.translate_timeout,
            )?)
        }
        None => {
            warn!("LINGO_TRANSLATE_URL unset; messages will be delivered untranslated");
            Arc::new(DisabledTranslator)
        }
    };
    let classifier: Arc<dyn IntentClassifier> = match &config.wit_token {
        Some(token) => Arc::new(WitClassifier::new(
            &config.wit_url,
            token.clone(),
            config.intent_timeout,
        )?),
        None => {
            warn!("LINGO_WIT_TOKEN unset; chatbot will only give its fallback reply");
            Arc::new(DisabledClassifier)
        }
    };

    // Shared state
    let broadcaster = Broadcaster::new();
    let dispatcher = MessageDispatcher::new(db.clone(), broadcaster.clone(), translator, classifier)
        .with_translate_timeout(config.translate_timeout);
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        broadcaster,
        dispatcher,
        upload_dir: config.upload_dir.clone(),
    });

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(origin)?))
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let app = lingo_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Lingo server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
