use std::process;
use std::sync::Arc;

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_sql::{Config as ApalisSqlConfig, postgres::PostgresStorage};
use brusio::{
    application::{
        error::AppError,
        repos::{LikesRepo, PostsRepo},
    },
    config,
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
    queue::{ConsumerContext, LikeBatch, process_like_batch},
};
use clap::Parser;
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
    let cli_args = config::CliArgs::parse();
    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Worker(Box::<config::WorkerArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Worker(_) => run_worker(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresStorage::setup(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "brusio::migrate", "migrations applied");
    Ok(())
}

async fn run_worker(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool.clone()));

    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let posts: Arc<dyn PostsRepo> = repositories.clone();
    let likes: Arc<dyn LikesRepo> = repositories.clone();
    let context = ConsumerContext { posts, likes };

    let storage: PostgresStorage<LikeBatch> = PostgresStorage::new_with_config(
        pool,
        ApalisSqlConfig::new(settings.queue.topic.as_str()),
    );

    let concurrency = settings.queue.consumer_concurrency.get() as usize;

    info!(
        target = "brusio::worker",
        topic = settings.queue.topic,
        concurrency,
        "starting like event consumer"
    );

    let worker = WorkerBuilder::new("like-events-worker")
        .concurrency(concurrency)
        .data(context)
        .backend(storage)
        .build_fn(process_like_batch);

    Monitor::new()
        .register(worker)
        .run()
        .await
        .map_err(|err| AppError::unexpected(format!("worker monitor error: {err}")))?;

    Ok(())
}
