mod cli;

use pixelforge::{
    activity::LogSink,
    catalog::CatalogStore,
    config,
    naming,
    pipeline::{self, codec},
    server,
};
use pixelforge_common::Action;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::time::Duration;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    config.server.apply_overrides(host, port);

    tracing::info!("Starting Pixelforge server");
    tracing::info!(
        "Images in {:?}, catalog at {:?}",
        config.storage.image_dir,
        config.storage.catalog_path
    );

    let log = LogSink::new(&config.storage.log_path);
    let flusher = log.start_flusher(Duration::from_secs(config.activity_log.flush_interval_secs));

    let catalog = match CatalogStore::load(
        &config.storage.catalog_path,
        &config.storage.image_dir,
        log.clone(),
    ) {
        Ok(catalog) => catalog,
        Err(e) => {
            flusher.stop().await;
            return Err(e.context("Cannot start without a readable catalog (run `pixelforge init`)"));
        }
    };
    std::fs::create_dir_all(&config.storage.image_dir).with_context(|| {
        format!("Failed to create image directory: {:?}", config.storage.image_dir)
    })?;

    let server_result = server::start_server(config, catalog.clone(), log.clone()).await;

    // Cleanup
    tracing::info!("Shutting down...");
    catalog.settle().await;
    if let Err(e) = catalog.persist() {
        tracing::error!("Final catalog persist failed: {}", e);
        log.log(format!("could not persist catalog on shutdown: {}", e));
    }
    log.log("server stopped");
    flusher.stop().await;

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "pixelforge=trace,pixelforge_filters=debug,tower_http=debug".to_string()
        } else {
            "pixelforge=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Init => init(cli.config.as_deref()),
        Commands::Apply {
            input,
            action,
            output,
        } => apply(&input, &action, output, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("pixelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    std::fs::create_dir_all(&config.storage.image_dir).with_context(|| {
        format!("Failed to create image directory: {:?}", config.storage.image_dir)
    })?;
    println!("Image directory: {:?}", config.storage.image_dir);

    if CatalogStore::init_file(&config.storage.catalog_path)? {
        println!("Created empty catalog: {:?}", config.storage.catalog_path);
    } else {
        println!("Catalog already exists: {:?}", config.storage.catalog_path);
    }

    Ok(())
}

fn apply(input: &Path, action: &str, output: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let action: Action = action.parse()?;

    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let decoded = codec::decode(&bytes)?;
    let format = decoded.output_format()?;

    let filter = pipeline::filter_for(action, config.processing.blur_radius);
    tracing::info!(
        "Applying {} to {}x{} image",
        filter.name(),
        decoded.buffer.width(),
        decoded.buffer.height()
    );
    let filtered = filter.apply(&decoded.buffer);
    let encoded = codec::encode(&filtered, format, config.processing.jpeg_quality)?;

    let output = match output {
        Some(path) => path,
        None => {
            let source = input
                .file_name()
                .and_then(|n| n.to_str())
                .context("Input path has no usable file name")?;
            input.with_file_name(naming::output_name(action, Some(source), None, format)?)
        }
    };
    std::fs::write(&output, encoded).with_context(|| format!("Failed to write {:?}", output))?;

    println!("Wrote {:?}", output);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Image dir: {:?}", config.storage.image_dir);
            println!("  Catalog: {:?}", config.storage.catalog_path);
            println!("  Activity log: {:?}", config.storage.log_path);
            println!(
                "  Blur radius: {}, JPEG quality: {}",
                config.processing.blur_radius, config.processing.jpeg_quality
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
