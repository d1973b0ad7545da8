//! Start command - launches the nerloop server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Args;

use nerloop_config::{
    self, NerEngineKind, NerSection, NerloopConfig, StorageBackend, StorageConfig,
};
use nerloop_feedback::{
    DocumentKeys, DocumentStore, FeedbackContext, InferenceSettings, LoadWarning,
    SessionController,
};
use nerloop_ner::{GazetteerEngine, HttpNerEngine, NerEngine};
use nerloop_server::{AppState, Server, ServerConfig};
use nerloop_storage::{FsBlobStore, GcsBlobStore, MemoryBlobStore, SharedBlobStore};
use tracing::{info, warn};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Storage backend: fs, memory or gcs (overrides config)
    #[arg(long)]
    pub storage: Option<StorageBackend>,

    /// Directory for the fs storage backend (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let loaded = match args.config {
        Some(ref path) => nerloop_config::LoadedConfig::from_file(path)?,
        None => nerloop_config::load_config(None),
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    if ctx.verbose {
        for path in loaded.loaded_from() {
            eprintln!("config: {}", path.display());
        }
    }

    let mut config = loaded.config;
    apply_overrides(&mut config, &args);

    let server_section = config.server();
    let server_config = ServerConfig::from_section(&server_section)?;

    // ── Build storage, engine and controller ───────────────────────────
    //
    // Blocking HTTP clients must not be created on an async worker.

    let (controller, warnings) = tokio::task::spawn_blocking(move || build_controller(&config))
        .await
        .context("startup task failed")??;

    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }

    let addr: SocketAddr = server_config.bind_address;
    info!(
        addr = %addr,
        engine = controller.engine_name(),
        storage = controller.context().documents().backend_name(),
        "Starting nerloop"
    );
    if !ctx.json_output {
        println!("nerloop listening on http://{addr}");
    }

    let state = AppState::new(controller, server_config).with_load_warnings(warnings);
    Server::from_state(state).run().await?;
    Ok(())
}

fn apply_overrides(config: &mut NerloopConfig, args: &StartArgs) {
    let mut server = config.server();
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(ref bind) = args.bind {
        server.bind = bind.clone();
    }
    config.server = Some(server);

    let mut storage = config.storage();
    if let Some(backend) = args.storage {
        storage.backend = backend;
    }
    if let Some(ref dir) = args.data_dir {
        storage.dir = Some(dir.clone());
    }
    config.storage = Some(storage);
}

/// Build the session controller from configuration.
///
/// Fails if the NER engine cannot be constructed; a server without a
/// model is useless.
fn build_controller(config: &NerloopConfig) -> Result<(SessionController, Vec<LoadWarning>)> {
    let storage = config.storage();
    let ner = config.ner();

    let store = build_store(&storage)?;
    let engine = build_engine(&ner, &store)?;

    let documents = DocumentStore::new(store, DocumentKeys::from(&storage));
    let (context, warnings) = FeedbackContext::load(documents, &config.learning())?;

    Ok((
        SessionController::new(context, engine, InferenceSettings::from(&ner)),
        warnings,
    ))
}

fn build_store(config: &StorageConfig) -> Result<SharedBlobStore> {
    let store: SharedBlobStore = match config.backend {
        StorageBackend::Fs => {
            let dir = config.resolved_dir();
            info!(dir = %dir.display(), "Using filesystem storage");
            Arc::new(FsBlobStore::open(dir)?)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            Arc::new(MemoryBlobStore::new())
        }
        StorageBackend::Gcs => {
            let bucket = config.require_bucket()?;
            let token = match config.resolve_token() {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "No GCS token, requests will be unauthenticated");
                    None
                }
            };
            info!(bucket, "Using GCS storage");
            Arc::new(GcsBlobStore::with_timeout(
                bucket,
                token,
                Duration::from_secs(config.timeout_secs),
            )?)
        }
    };
    Ok(store)
}

fn build_engine(config: &NerSection, store: &SharedBlobStore) -> Result<Arc<dyn NerEngine>> {
    let engine: Arc<dyn NerEngine> = match config.engine {
        NerEngineKind::Gazetteer => {
            let engine = GazetteerEngine::new(&config.gazetteer)?;
            if engine.label_count() == 0 {
                warn!("Gazetteer is empty; no entities will be recognized");
            }
            Arc::new(engine)
        }
        NerEngineKind::Http => {
            let Some(ref endpoint) = config.endpoint else {
                bail!("[ner] engine = \"http\" requires an endpoint");
            };
            Arc::new(HttpNerEngine::with_timeout(
                endpoint.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)
        }
        NerEngineKind::Gliner => build_gliner(config, store)?,
    };
    info!(engine = engine.name(), labels = ?config.labels, "NER engine ready");
    Ok(engine)
}

#[cfg(feature = "gliner")]
fn build_gliner(config: &NerSection, store: &SharedBlobStore) -> Result<Arc<dyn NerEngine>> {
    use nerloop_ner::{GlinerConfig, GlinerEngine, fetch_model_files};

    let (model_path, tokenizer_path) = match (&config.model_path, &config.tokenizer_path) {
        (Some(model), Some(tokenizer)) => (model.clone(), tokenizer.clone()),
        _ => {
            let Some(ref prefix) = config.model_blob_prefix else {
                bail!("[ner] engine = \"gliner\" needs model_path and tokenizer_path, or model_blob_prefix");
            };
            fetch_model_files(store.as_ref(), prefix, &config.resolved_cache_dir())?
        }
    };

    let engine = GlinerEngine::new(&GlinerConfig {
        model_path,
        tokenizer_path,
        threshold: config.threshold,
    })?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "gliner"))]
fn build_gliner(_config: &NerSection, _store: &SharedBlobStore) -> Result<Arc<dyn NerEngine>> {
    bail!("this build of nerloop does not include GLiNER support (rebuild with --features gliner)")
}
