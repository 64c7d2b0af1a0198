//! etlgen UI server - web front end for generating, running and packaging ETL code.

mod routes;
mod sse;
mod state;

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::response::Html;
use axum::routing::get;
use clap::Parser;
use etlgen::io::config::{DEFAULT_CONFIG_FILE, load_config};
use etlgen::io::generator::{CodeGenerator, build_generator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Parser)]
#[command(name = "etlgen-ui")]
#[command(about = "Web UI for generating, running and packaging ETL code")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Directory run directories and archives are created in
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Config file (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Serve UI static files from this directory instead of the embedded page
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("etlgen_ui=info".parse()?),
        )
        .init();
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    fs::create_dir_all(&args.base_dir)
        .with_context(|| format!("create {}", args.base_dir.display()))?;
    let base_dir = args.base_dir.canonicalize().unwrap_or(args.base_dir);
    info!(base_dir = %base_dir.display(), "starting etlgen-ui");

    let generator: Arc<dyn CodeGenerator> = Arc::from(build_generator(&cfg.generator)?);
    let state = AppState::new(base_dir, cfg, generator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().nest("/api", routes::api_router());

    match args.ui_dir {
        Some(ui_dir) if ui_dir.exists() => {
            info!(ui_dir = %ui_dir.display(), "serving static UI files");
            app = app
                .fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
        }
        Some(ui_dir) => {
            info!(ui_dir = %ui_dir.display(), "UI directory not found, serving embedded page");
            app = app.route("/", get(index));
        }
        None => {
            app = app.route("/", get(index));
        }
    }

    let app = app.layer(cors).with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
