use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use backup_console_core::{PageRequest, ResourceScope, View, CARD_LIMIT};
use backup_console_daemon::config::{self, Config};
use backup_console_daemon::{build_router, AppState};
use backup_console_storage::{load_backups_page, BackupCatalog, JsonCatalog, SqliteCatalog};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

enum Mode {
    Serve,
    Report {
        database_id: String,
        page: Option<String>,
        limit: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (cfg, mode) = parse_args()?;
    let catalog = open_catalog(&cfg)?;
    let default_limit = cfg.paging.default_limit.unwrap_or(CARD_LIMIT);

    match mode {
        Mode::Serve => run_service(catalog, default_limit, &cfg).await,
        Mode::Report {
            database_id,
            page,
            limit,
        } => {
            let request = PageRequest::from_query(
                page.as_deref(),
                limit.as_deref(),
                None,
                default_limit,
                View::Grid,
            );
            run_report(catalog.as_ref(), &database_id, request).await
        }
    }
}

/// Parse CLI args: `[--config PATH] [serve | report <database_id> [--page N] [--limit N]]`.
fn parse_args() -> Result<(Config, Mode)> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut config_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut page: Option<String> = None;
    let mut limit: Option<String> = None;
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = iter.next() else {
                    bail!("--config requires a path argument");
                };
                config_path = Some(PathBuf::from(path));
            }
            "--page" => {
                let Some(value) = iter.next() else {
                    bail!("--page requires a value");
                };
                page = Some(value);
            }
            "--limit" => {
                let Some(value) = iter.next() else {
                    bail!("--limit requires a value");
                };
                limit = Some(value);
            }
            _ => positional.push(arg),
        }
    }

    let mode = match positional.first().map(String::as_str) {
        None | Some("serve") => Mode::Serve,
        Some("report") => {
            let Some(database_id) = positional.get(1).cloned() else {
                bail!("report requires a database id");
            };
            Mode::Report {
                database_id,
                page,
                limit,
            }
        }
        Some(other) => bail!("unknown command: {other}"),
    };

    let cfg = match config_path {
        Some(path) => {
            info!(?path, "loading config file");
            config::load_config(&path)?
        }
        None => Config::default(),
    };

    Ok((cfg, mode))
}

fn open_catalog(cfg: &Config) -> Result<Arc<dyn BackupCatalog>> {
    let path = env::var("BACKUP_CONSOLE_CATALOG")
        .ok()
        .or_else(|| cfg.storage.path.clone())
        .unwrap_or_else(|| "./catalog.json".to_owned());
    let path = PathBuf::from(path);

    let backend = env::var("BACKUP_CONSOLE_BACKEND")
        .ok()
        .or_else(|| cfg.storage.backend.clone())
        .unwrap_or_else(|| infer_backend(&path).to_owned());

    info!(path = %path.display(), %backend, "opening backup catalog");
    match backend.as_str() {
        "json" => Ok(Arc::new(JsonCatalog::new(path))),
        "sqlite" => Ok(Arc::new(
            SqliteCatalog::new(path).context("open sqlite catalog")?,
        )),
        other => bail!("unknown storage backend: {other}"),
    }
}

fn infer_backend(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("db" | "sqlite" | "sqlite3") => "sqlite",
        _ => "json",
    }
}

async fn run_report(catalog: &dyn BackupCatalog, database_id: &str, request: PageRequest) -> Result<()> {
    let scope = ResourceScope::database(database_id);
    let page = load_backups_page(catalog, &scope, request, Utc::now()).await?;
    info!(
        database_id,
        archives = page.backups.archives.len(),
        policies = page.policies.policies.len(),
        with_last_backup = page.last_backup_dates.len(),
        "backups page assembled"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&page).context("serialize backups page")?
    );
    Ok(())
}

async fn run_service(catalog: Arc<dyn BackupCatalog>, default_limit: u32, cfg: &Config) -> Result<()> {
    let listen = env::var("BACKUP_CONSOLE_LISTEN")
        .ok()
        .or_else(|| cfg.server.listen.clone())
        .unwrap_or_else(|| "127.0.0.1:8089".to_owned());

    let state = AppState {
        catalog,
        clock: Utc::now,
        default_limit,
        api_token: env::var("BACKUP_CONSOLE_API_TOKEN")
            .ok()
            .or_else(|| cfg.security.api_token.clone()),
    };

    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;
    let app = build_router(state);

    info!(%addr, "starting backup console API");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
