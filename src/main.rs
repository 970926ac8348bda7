use axum::{extract::State, response::Json, routing::get, Router};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use standup_monitor::clock::{Clock, SystemClock};
use standup_monitor::collector::CollectorClient;
use standup_monitor::config::AppConfig;
use standup_monitor::database::{Database, Store};
use standup_monitor::monitor::EscalationEngine;
use standup_monitor::notifier::{LogNotifier, Notifier, SlackNotifier};

#[derive(Parser)]
#[command(name = "standup-monitor")]
#[command(about = "Watches standup reports and escalates missing ones")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); STANDUP_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick loop and the HTTP status server
    Serve,
    /// Run a single tick and print its summary
    Tick,
    /// Build and send the rook report now
    Rooks,
    /// Apply the database schema and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "standup_monitor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Configuration loaded");

    let database = Database::new(&config.database_url).await?;
    info!("Database connected");

    database.run_migrations().await?;
    info!("Database migrations completed");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => info!("Schema is up to date"),
        Commands::Tick => {
            let engine = build_engine(&config, &database, Arc::new(SystemClock))?;
            let summary = engine.tick().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Rooks => {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let engine = build_engine(&config, &database, clock.clone())?;
            let report = engine.reveal_rooks(clock.now()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve => {
            let engine = build_engine(&config, &database, Arc::new(SystemClock))?;
            serve(config, database, Arc::new(engine)).await?;
        }
    }

    Ok(())
}

fn build_engine(config: &AppConfig, database: &Database, clock: Arc<dyn Clock>) -> anyhow::Result<EscalationEngine> {
    let notifier: Arc<dyn Notifier> = if config.dry_run {
        info!("Dry run: messages are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(SlackNotifier::new(
            config.chat_api_url.clone(),
            config.chat_token.clone(),
        ))
    };

    let collector = CollectorClient::new(
        config.collector_url.clone(),
        config.collector_token.clone(),
        config.collector_timeout(),
    )?;

    Ok(EscalationEngine::new(
        Arc::new(database.clone()),
        notifier,
        Arc::new(collector),
        clock,
        config.escalation()?,
    ))
}

async fn serve(config: AppConfig, database: Database, engine: Arc<EscalationEngine>) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    let mut engine_rx = shutdown_rx.clone();
    let engine_task = tokio::spawn(async move {
        engine
            .run(async move {
                let _ = engine_rx.changed().await;
            })
            .await;
    });
    info!("Escalation engine started");

    let addr: SocketAddr = config.http_bind_addr.parse()?;
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state((config, database));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let mut server_rx = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_rx.changed().await;
        })
        .await?;

    engine_task.await?;
    info!("Standup monitor stopped");
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "standup-monitor",
        "timestamp": chrono::Utc::now()
    }))
}

async fn status_endpoint(State((config, database)): State<(AppConfig, Database)>) -> Json<serde_json::Value> {
    let mut status = serde_json::json!({
        "status": "healthy",
        "service": "standup-monitor",
        "timestamp": chrono::Utc::now(),
        "dry_run": config.dry_run,
    });

    match database.all_groups().await {
        Ok(groups) => {
            let monitored = groups.iter().filter(|g| g.deadline.is_some()).count();
            status["database"] = serde_json::json!({
                "status": "healthy",
                "groups": groups.len(),
                "monitored_groups": monitored
            });
        }
        Err(e) => {
            error!("Status check could not list groups: {}", e);
            status["database"] = serde_json::json!({ "status": "error" });
        }
    }

    Json(status)
}
