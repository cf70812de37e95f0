use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use futures_util::future::join_all;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixload::domain::entities::{
    CachePolicy, ErrorResult, ImageRequest, RequestData, Size, SuccessResult,
};
use pixload::domain::ports::Target;
use pixload::infrastructure::transformations::{Blur, Grayscale};
use pixload::infrastructure::{
    CliArgs, ConfigStore, ImageLoader, LoaderConfig, LoggingEventListener,
};

fn init_logging(config: &LoaderConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

/// Prints each outcome as it is delivered.
struct ConsoleTarget {
    input: String,
}

impl Target for ConsoleTarget {
    fn on_success(&self, result: &SuccessResult) {
        println!(
            "{}: {}x{} {} from {}{}",
            self.input,
            result.image.width(),
            result.image.height(),
            result.image.format(),
            result.data_source,
            if result.is_sampled { " (sampled)" } else { "" }
        );
    }

    fn on_error(&self, result: &ErrorResult) {
        println!("{}: error: {}", self.input, result.error);
    }
}

fn parse_input(input: &str) -> RequestData {
    input
        .parse::<u32>()
        .map_or_else(|_| RequestData::from(input), RequestData::ResourceId)
}

fn build_request(loader: &ImageLoader, args: &CliArgs, input: &str) -> ImageRequest {
    let mut builder = loader
        .new_request(parse_input(input))
        .target(Arc::new(ConsoleTarget {
            input: input.to_string(),
        }));
    if let (Some(width), Some(height)) = (args.width, args.height) {
        builder = builder.size(Size::pixels(width, height));
    }
    if args.grayscale {
        builder = builder.transformation(Arc::new(Grayscale));
    }
    if let Some(sigma) = args.blur {
        builder = builder.transformation(Arc::new(Blur::new(sigma)));
    }
    if args.no_cache {
        builder = builder.memory_cache_policy(CachePolicy::Disabled);
    }
    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let store = ConfigStore::new()?;
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);

    init_logging(&config)?;
    info!(version = pixload::VERSION, "Starting pixload");

    let loader = ImageLoader::builder()
        .config(config)
        .listener(Arc::new(LoggingEventListener))
        .build()?;

    for round in 0..args.repeat {
        // Outcomes are printed by each request's target.
        let requests = args
            .inputs
            .iter()
            .map(|input| loader.execute(build_request(&loader, &args, input)));
        let cancelled = join_all(requests)
            .await
            .into_iter()
            .filter(Result::is_err)
            .count();
        if cancelled > 0 {
            warn!(round, cancelled, "Some requests were cancelled");
        }
    }

    println!("{}", loader.stats());
    loader.shutdown();
    Ok(())
}
