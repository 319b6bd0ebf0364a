use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deen_app::controller::AppController;
use deen_app::state::AppState;
use deen_app::ui::{UiOptions, spawn_stdin_reader};
use deen_config::Config;
use deen_dict::{CacheStorage, FsCacheStorage, HttpSource, MemoryCacheStorage, RemoteSource};
use deen_types::UiCommand;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// German/English dictionary lookup.
///
/// Without a search term, terms are read from stdin, one per line.
/// Commands: :back, :fwd, :rand, :status, :quit
#[derive(Parser)]
#[command(name = "deen", version, about)]
struct Cli {
    /// Search term
    term: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the dictionary in memory only
    #[arg(long)]
    no_cache: bool,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,

    /// Show a random entry
    #[arg(long)]
    random: bool,

    /// Run only the worker, speaking JSON lines on stdin/stdout
    #[arg(long)]
    worker_stdio: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };

    let source: Arc<dyn RemoteSource> = Arc::new(HttpSource::new(Duration::from_secs(
        config.dictionary.fetch_timeout_secs,
    ))?);
    let storage: Arc<dyn CacheStorage> = if cli.no_cache {
        Arc::new(MemoryCacheStorage::new())
    } else {
        Arc::new(FsCacheStorage::new(config.dictionary.cache_dir.clone()))
    };

    let ui = UiOptions {
        max_results: config.search.max_results,
        one_shot: cli.term.is_some() || cli.random,
        random_on_ready: cli.random,
        highlight: std::io::stdout().is_terminal(),
    };
    let state = Arc::new(AppState::new(config));

    if cli.worker_stdio {
        let cancel = CancellationToken::new();
        return tokio::select! {
            result = deen_app::stdio::serve_stdio(state, source, storage, cancel.clone()) => result,
            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                cancel.cancel();
                Ok(())
            }
        };
    }

    let one_shot = ui.one_shot;
    let controller = AppController::new(state);
    let (mut tasks, mut ui_task) = controller.spawn_tasks(source, storage, ui).await;

    if let Some(term) = cli.term {
        // becomes the current location, searched once the dictionary is ready
        controller.commands().send(UiCommand::Search(term)).await?;
    } else if !one_shot {
        spawn_stdin_reader(controller.commands());
    }

    let finished = tokio::select! {
        _ = signal::ctrl_c() => Finished::Interrupted,
        joined = &mut ui_task => Finished::Ui(flatten(joined)),
        Some(joined) = tasks.join_next() => Finished::Background(flatten(joined)),
    };

    let result = match finished {
        Finished::Interrupted => {
            tracing::info!("Shutdown requested");
            ui_task.abort();
            Ok(())
        }
        Finished::Ui(result) => result,
        // the controller stopped normally, let the front end print what it has
        Finished::Background(Ok(())) => flatten(ui_task.await),
        Finished::Background(Err(e)) => {
            ui_task.abort();
            Err(e)
        }
    };

    controller.shutdown();
    tasks.shutdown().await;
    result
}

enum Finished {
    Interrupted,
    Ui(anyhow::Result<()>),
    Background(anyhow::Result<()>),
}

fn flatten(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) -> anyhow::Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Task panicked: {e}");
            Err(e.into())
        }
    }
}
