use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use file_indexer_core::{
    absolute_root, DocumentExtractor, ExifToolReader, FileWatcher, IndexCoordinator,
    IngestionOptions, MeilisearchStore, PathFilter, TikaExtractor, WatchStrategy,
    EVENT_QUEUE_CAPACITY,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const INDEX_SETTLE_DELAY: Duration = Duration::from_secs(2);

type Coordinator = IndexCoordinator<MeilisearchStore, TikaExtractor, ExifToolReader>;

#[derive(Parser)]
#[command(name = "file-indexer", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Meilisearch base URL
    #[arg(long, env = "MEILI_URL")]
    meili_url: String,

    /// Meilisearch API key
    #[arg(long, env = "MEILI_API_KEY", hide_env_values = true)]
    meili_api_key: String,

    /// Tika server base URL
    #[arg(long, env = "TIKA_URL")]
    tika_url: String,

    /// Index uid
    #[arg(long, env = "MEILI_INDEX", default_value = "files")]
    index_uid: String,

    /// Directory tree to index
    #[arg(long, env = "INDEX_ROOT", default_value = "/data")]
    root: PathBuf,

    /// Files above this size are skipped.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value = "10")]
    max_file_size_mb: u64,

    /// Extra directory names to ignore, on top of the built-in set.
    #[arg(long = "ignore-dir", env = "IGNORE_DIRS", value_delimiter = ',')]
    ignore_dirs: Vec<String>,

    /// exiftool command line, e.g. `perl /opt/exiftool/exiftool`
    #[arg(long, env = "EXIFTOOL_BIN", default_value = "exiftool")]
    exiftool: String,

    #[arg(long, env = "WATCH_MODE", value_enum, default_value_t = WatchMode::Poll)]
    watch_mode: WatchMode,

    /// Polling interval, only used with `--watch-mode poll`.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "5")]
    poll_interval_secs: u64,

    #[arg(long, env = "HEARTBEAT_SECS", default_value = "60")]
    heartbeat_secs: u64,

    /// Remove index entries whose file is gone before the first scan.
    #[arg(long, env = "RECONCILE_ORPHANS", default_value_t = false)]
    reconcile: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Reconcile (optional), scan, then watch for changes until interrupted.
    Run,
    /// Index every existing file once and exit.
    Scan,
    /// Remove orphaned index entries and exit.
    Reconcile,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WatchMode {
    /// Periodic snapshots; works on network and container mounts.
    Poll,
    /// OS notifications (inotify, FSEvents, ...).
    Native,
}

impl Cli {
    fn watch_strategy(&self) -> WatchStrategy {
        match self.watch_mode {
            WatchMode::Native => WatchStrategy::Native,
            WatchMode::Poll => WatchStrategy::Poll {
                interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            },
        }
    }

    fn build_coordinator(&self) -> anyhow::Result<Coordinator> {
        let store = MeilisearchStore::new(&self.meili_url, &self.meili_api_key, &self.index_uid)
            .with_context(|| format!("invalid Meilisearch URL `{}`", self.meili_url))?;
        let exiftool = ExifToolReader::from_command_line(&self.exiftool)
            .ok_or_else(|| anyhow!("exiftool command line is empty"))?;
        let extractor = DocumentExtractor::new(
            TikaExtractor::new(self.tika_url.as_str()),
            exiftool,
            PathFilter::new(&self.ignore_dirs),
            IngestionOptions::with_max_file_size_mb(self.max_file_size_mb),
        );

        Ok(IndexCoordinator::new(store, extractor))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .init();

    run_logged(Cli::parse()).await
}

async fn run_logged(cli: Cli) -> anyhow::Result<()> {
    run(cli)
        .await
        .inspect_err(|error| error!(error = ?error, "file-indexer failed"))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let root = absolute_root(&cli.root)
        .with_context(|| format!("cannot resolve index root {}", cli.root.display()))?;
    let coordinator = cli.build_coordinator()?;
    let strategy = cli.watch_strategy();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        root = %root.display(),
        max_file_size_mb = cli.max_file_size_mb,
        ignored = ?coordinator.filter().ignored_names().collect::<Vec<_>>(),
        ?strategy,
        "file-indexer boot"
    );

    match cli.command.unwrap_or(Command::Run) {
        Command::Reconcile => {
            let report = coordinator.reconcile().await;
            println!(
                "{} documents checked, {} orphans removed at {}",
                report.checked,
                report.removed,
                Utc::now().to_rfc3339()
            );
        }
        Command::Scan => {
            prepare(&coordinator).await;
            let report = coordinator.scan(&root).await;
            println!(
                "{} files processed, {} published, {} failed, {} skipped at {}",
                report.processed,
                report.published,
                report.failed,
                report.skipped,
                Utc::now().to_rfc3339()
            );
        }
        Command::Run => {
            prepare(&coordinator).await;
            if cli.reconcile {
                coordinator.reconcile().await;
            }
            coordinator.scan(&root).await;

            let heartbeat = Duration::from_secs(cli.heartbeat_secs.max(1));
            run_watch_loop(&coordinator, &root, strategy, heartbeat).await?;
        }
    }

    Ok(())
}

async fn prepare(coordinator: &Coordinator) {
    coordinator.prepare_index().await;
    tokio::time::sleep(INDEX_SETTLE_DELAY).await;
}

async fn run_watch_loop(
    coordinator: &Coordinator,
    root: &Path,
    strategy: WatchStrategy,
    heartbeat: Duration,
) -> anyhow::Result<()> {
    let (events, queue) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let watched_root = root.to_path_buf();
    let watcher = tokio::task::spawn_blocking(move || {
        FileWatcher::start(&watched_root, strategy, events)
    })
    .await
    .context("watcher setup task failed")?
    .with_context(|| format!("cannot watch {}", root.display()))?;

    info!(root = %watcher.root().display(), "watching for changes");

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(error = %error, "cannot listen for interrupt");
            std::future::pending::<()>().await;
        }
    };
    let handled = coordinator.watch(queue, heartbeat, shutdown).await;

    drop(watcher);
    info!(handled, "file-indexer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn cli(args: &[&str]) -> Cli {
        let base = [
            "file-indexer",
            "--meili-api-key",
            "secret",
            "--tika-url",
            "http://127.0.0.1:9998",
        ];
        Cli::try_parse_from(base.iter().chain(args)).expect("arguments parse")
    }

    #[tokio::test]
    #[traced_test]
    async fn startup_failures_are_logged_with_context() {
        let result = run_logged(cli(&["--meili-url", "not a url", "scan"])).await;

        assert!(result.is_err());
        assert!(logs_contain("file-indexer failed"));
        assert!(logs_contain("invalid Meilisearch URL `not a url`"));
    }

    #[test]
    fn poll_mode_is_the_default() {
        let cli = cli(&["--meili-url", "http://127.0.0.1:7700"]);

        assert!(cli.command.is_none());
        assert_eq!(
            cli.watch_strategy(),
            WatchStrategy::Poll {
                interval: Duration::from_secs(5)
            }
        );
    }
}
