//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brusio";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_FEED_TTL_SECONDS: u64 = 300;
const DEFAULT_LIKE_TTL_SECONDS: u64 = 300;
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_MAX_BATCH: usize = 100;
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;
const DEFAULT_QUEUE_TOPIC: &str = "like_events";
const DEFAULT_CONSUMER_CONCURRENCY: u32 = 2;

/// Command-line arguments for the Brusio binary.
#[derive(Debug, Parser)]
#[command(name = "brusio", version, about = "Brusio feed cache services")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BRUSIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the like event consumer workers.
    Worker(Box<WorkerArgs>),
    /// Apply database and queue migrations.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub overrides: WorkerOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WorkerOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the queue topic the workers consume.
    #[arg(long = "queue-topic", value_name = "NAME")]
    pub queue_topic: Option<String>,

    /// Override the consumer worker concurrency.
    #[arg(long = "queue-consumer-concurrency", value_name = "COUNT")]
    pub consumer_concurrency: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct MigrateArgs {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub batcher: BatcherSettings,
    pub queue: QueueSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis connection URL; required wherever a process touches the cache.
    pub url: Option<String>,
    pub feed_ttl_seconds: u64,
    pub like_ttl_seconds: u64,
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BatcherSettings {
    pub max_batch: NonZeroUsize,
    pub flush_interval_ms: NonZeroU64,
    pub channel_capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub topic: String,
    pub consumer_concurrency: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BRUSIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Worker(args)) => raw.apply_worker_overrides(&args.overrides),
        Some(Command::Migrate(args)) => {
            if let Some(url) = args.database_url.as_ref() {
                raw.database.url = Some(url.clone());
            }
        }
        None => raw.apply_worker_overrides(&WorkerOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    batcher: RawBatcherSettings,
    queue: RawQueueSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    url: Option<String>,
    feed_ttl_seconds: Option<u64>,
    like_ttl_seconds: Option<u64>,
    op_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBatcherSettings {
    max_batch: Option<usize>,
    flush_interval_ms: Option<u64>,
    channel_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQueueSettings {
    topic: Option<String>,
    consumer_concurrency: Option<u32>,
}

impl RawSettings {
    fn apply_worker_overrides(&mut self, overrides: &WorkerOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(topic) = overrides.queue_topic.as_ref() {
            self.queue.topic = Some(topic.clone());
        }
        if let Some(concurrency) = overrides.consumer_concurrency {
            self.queue.consumer_concurrency = Some(concurrency);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            batcher,
            queue,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            batcher: build_batcher_settings(batcher)?,
            queue: build_queue_settings(queue)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = database.max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url: database.url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let feed_ttl_seconds = cache.feed_ttl_seconds.unwrap_or(DEFAULT_FEED_TTL_SECONDS);
    if feed_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.feed_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let like_ttl_seconds = cache.like_ttl_seconds.unwrap_or(DEFAULT_LIKE_TTL_SECONDS);
    if like_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.like_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let op_timeout_ms = cache.op_timeout_ms.unwrap_or(DEFAULT_CACHE_OP_TIMEOUT_MS);
    if op_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.op_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        url: cache.url,
        feed_ttl_seconds,
        like_ttl_seconds,
        op_timeout_ms,
    })
}

fn build_batcher_settings(batcher: RawBatcherSettings) -> Result<BatcherSettings, LoadError> {
    let max_batch = batcher.max_batch.unwrap_or(DEFAULT_MAX_BATCH);
    let max_batch = NonZeroUsize::new(max_batch)
        .ok_or_else(|| LoadError::invalid("batcher.max_batch", "must be greater than zero"))?;

    let flush_interval_ms = batcher
        .flush_interval_ms
        .unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
    let flush_interval_ms = NonZeroU64::new(flush_interval_ms).ok_or_else(|| {
        LoadError::invalid("batcher.flush_interval_ms", "must be greater than zero")
    })?;

    let channel_capacity = batcher.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
    let channel_capacity = NonZeroUsize::new(channel_capacity).ok_or_else(|| {
        LoadError::invalid("batcher.channel_capacity", "must be greater than zero")
    })?;

    Ok(BatcherSettings {
        max_batch,
        flush_interval_ms,
        channel_capacity,
    })
}

fn build_queue_settings(queue: RawQueueSettings) -> Result<QueueSettings, LoadError> {
    let topic = queue
        .topic
        .unwrap_or_else(|| DEFAULT_QUEUE_TOPIC.to_string());
    if topic.is_empty() {
        return Err(LoadError::invalid("queue.topic", "must not be empty"));
    }

    let consumer_concurrency = queue
        .consumer_concurrency
        .unwrap_or(DEFAULT_CONSUMER_CONCURRENCY);
    let consumer_concurrency = NonZeroU32::new(consumer_concurrency).ok_or_else(|| {
        LoadError::invalid("queue.consumer_concurrency", "must be greater than zero")
    })?;

    Ok(QueueSettings {
        topic,
        consumer_concurrency,
    })
}
