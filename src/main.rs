use anyhow::Context;
use matchstats::config::Config;
use matchstats::hooks::PersistMatchUpdater;
use matchstats::jobs::JobProgress;
use matchstats::matches::Match;
use matchstats::mongo::{Mongo, MongoCache, MongoJobQueue, MongoStore};
use matchstats::operations::Operations;
use matchstats::player::SteamSummary;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const USAGE: &str = "usage: matchstats [config.toml] <player|import|request> <file.json>";

/// Outer job for requests made from the command line
struct LogProgress {
    match_id: u64,
}

impl JobProgress for LogProgress {
    fn progress(&self, current: u32, total: u32, message: Option<&str>) {
        match message {
            Some(msg) => tracing::info!("match {}: {}/{} {}", self.match_id, current, total, msg),
            None => tracing::info!("match {}: {}/{}", self.match_id, current, total),
        }
    }
}

#[tokio::main]
async fn main() {
    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("matchstats")
        .filename_suffix("log")
        .build("logs")
        .expect("initializing rolling file appender failed");

    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr.and(non_blocking))
        .with_ansi(true)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = if args.first().is_some_and(|a| a.ends_with(".toml")) {
        args.remove(0)
    } else {
        "./config.toml".to_string()
    };

    let config = match get_config(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return;
        }
    };

    if let Err(e) = run(config, args).await {
        tracing::error!("Error: {}", e);
        tracing::error!("  {:?}", e);
    }
}

async fn run(config: Config, args: Vec<String>) -> anyhow::Result<()> {
    let (command, file) = match args.as_slice() {
        [command, file] => (command.as_str(), file.as_str()),
        _ => anyhow::bail!(USAGE),
    };

    let mongo = Mongo::connect(&config.mongo).await?;
    let store = Arc::new(MongoStore::new(mongo.clone()));
    let ops = Operations::new(
        store.clone(),
        Arc::new(MongoCache::new(&mongo)),
        Arc::new(MongoJobQueue::new(&mongo, config.jobs.poll_interval())),
        Arc::new(PersistMatchUpdater::new(store)),
        config.jobs.clone(),
    );

    match command {
        "player" => {
            let summary: SteamSummary = read_json(file).await?;
            let account_id = ops.insert_player(summary).await?;
            tracing::info!("upserted player {}", account_id);
        }
        "import" => {
            let m: Match = read_json(file).await?;
            match ops.insert_match(&m).await? {
                Some(job) => tracing::info!("match {} queued as job {}", m.match_id, job.id),
                None => tracing::info!("match {} stored, parse declined", m.match_id),
            }
        }
        "request" => {
            let m: Match = read_json(file).await?;
            let outer = LogProgress {
                match_id: m.match_id,
            };
            ops.insert_match_progress(&m, &outer).await?;
        }
        other => anyhow::bail!("unknown command {:?}\n{}", other, USAGE),
    }

    Ok(())
}

async fn read_file<P: AsRef<Path>>(path: P) -> anyhow::Result<String> {
    let mut f = File::open(path).await.context("could not open file")?;
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .await
        .context("could not read file")?;
    Ok(contents)
}

async fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let json = read_file(path).await?;
    serde_json::from_str(&json).with_context(|| format!("could not parse {}", path))
}

async fn get_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let toml = read_file(path).await.context("could not load config file")?;
    let config = toml::from_str(&toml).context("could not parse config file")?;

    Ok(config)
}
