use std::{process, sync::Arc};

use innesto::{
    application::{auth::AuthService, error::AppError, posts::PostService},
    config,
    domain::types::StorageBackend,
    infra::{
        blob::FsObjectStore,
        error::InfraError,
        http::{self, AppState},
        kv::{FsKeyValueStore, KeyValueStore},
        store::{BlobPostStore, KvPostStore, PostStore, blob::compose_document},
        telemetry,
    },
};
use tokio::fs;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Sync(_) => run_sync(settings).await,
    }
}

struct StorageContext {
    kv: Arc<dyn KeyValueStore>,
    store: Arc<dyn PostStore>,
}

/// Build the storage capabilities. The backend strategy is decided here,
/// once, from configuration; auth tokens always live in the key-value
/// store regardless of which post backend is active.
fn init_storage(settings: &config::Settings) -> Result<StorageContext, AppError> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(
        FsKeyValueStore::new(settings.storage.data_dir.join("kv")).map_err(AppError::from)?,
    );

    let store: Arc<dyn PostStore> = match settings.storage.backend {
        StorageBackend::Kv => Arc::new(KvPostStore::new(kv.clone())),
        StorageBackend::Blob => {
            let blob = FsObjectStore::new(settings.storage.data_dir.join("blob"))
                .map_err(AppError::from)?;
            Arc::new(BlobPostStore::new(Arc::new(blob)))
        }
    };

    Ok(StorageContext { kv, store })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let storage = init_storage(&settings)?;

    let state = AppState {
        posts: Arc::new(PostService::new(storage.store)),
        auth: Arc::new(AuthService::new(storage.kv)),
        site_root: settings.site.root.clone(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.public_addr,
        backend = ?settings.storage.backend,
        site_root = %settings.site.root.display(),
        "serving",
    );

    let drain_window = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                drain_timeout_secs = drain_window.as_secs(),
                "shutdown signal received, draining connections",
            );
        })
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown signal handler");
    }
}

/// Export every stored post into the static generator's source directory as
/// front-matter documents, so the next generator run picks them up.
async fn run_sync(settings: config::Settings) -> Result<(), AppError> {
    let storage = init_storage(&settings)?;
    let posts = PostService::new(storage.store);

    fs::create_dir_all(&settings.site.source_dir)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let summaries = posts
        .list(innesto::application::posts::StatusFilter::All, true)
        .await?;

    let mut exported = 0usize;
    let mut failed = 0usize;
    for summary in &summaries {
        match export_post(&posts, &summary.id, &settings.site.source_dir).await {
            Ok(target) => {
                exported += 1;
                info!(id = %summary.id, target = %target.display(), "exported post");
            }
            // One broken post must not abort the rest of the export.
            Err(err) => {
                failed += 1;
                error!(id = %summary.id, error = %err, "failed to export post");
            }
        }
    }

    info!(count = exported, failed = failed, "sync complete");
    Ok(())
}

async fn export_post(
    posts: &PostService,
    id: &str,
    source_dir: &std::path::Path,
) -> Result<std::path::PathBuf, AppError> {
    let post = posts.get(id).await?;
    let document = compose_document(&post)?;
    let target = source_dir.join(format!("{}.md", post.id));
    fs::write(&target, document)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    Ok(target)
}
