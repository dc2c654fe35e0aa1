//! WolfFiles - HTTP File API over Object Storage
//!
//! Serves create, read, list and delete for the files in one bucket, with
//! optional AI content generation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolffiles::api::HttpServer;
use wolffiles::config::{BackendKind, LoggingConfig, WolfFilesConfig};
use wolffiles::error::Result;
use wolffiles::files::FileService;
use wolffiles::generate::OpenAiGenerator;
use wolffiles::storage;

/// WolfFiles - HTTP File API over Object Storage
#[derive(Parser)]
#[command(name = "wolffiles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolffiles.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [logging].level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Start {
        /// Override the configured bind address (host:port)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolffiles.toml")]
        output: PathBuf,

        /// Bucket name
        #[arg(long, default_value = "my-bucket")]
        bucket: String,
    },

    /// Validate configuration file
    Validate,

    /// Show configuration summary
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it loads
    let logging = WolfFilesConfig::from_file(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or_else(|| logging.level.clone());
    init_logging(&level, &logging);

    match cli.command {
        Commands::Start { bind } => run_start(cli.config, bind).await,
        Commands::Init { output, bucket } => run_init(output, bucket),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
    }
}

/// Initialize logging; `RUST_LOG` takes precedence over `level`
fn init_logging(level: &str, logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Start the HTTP API server
async fn run_start(config_path: PathBuf, bind: Option<String>) -> Result<()> {
    let mut config = WolfFilesConfig::from_file(&config_path)?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    tracing::info!("Starting WolfFiles {}", env!("CARGO_PKG_VERSION"));

    let store = storage::connect(&config.storage).await?;
    let mut files = FileService::new(store, config.storage.timeout());

    match &config.generation {
        Some(generation) => {
            let generator = OpenAiGenerator::new(generation.clone())?;
            tracing::info!("Content generation enabled via {}", generation.base_url);
            files = files.with_generator(Arc::new(generator));
        }
        None => tracing::info!("Content generation disabled (no [generation] section)"),
    }

    let server = HttpServer::new(config.server.clone(), files);
    server.start().await
}

/// Write a starter configuration file
fn run_init(output: PathBuf, bucket: String) -> Result<()> {
    let config_content = format!(r#"# WolfFiles Configuration
# Generated configuration file

[server]
bind_address = "0.0.0.0:8000"
cors_enabled = false
max_upload_mb = 100

[storage]
backend = "s3"            # "s3" or "memory"
bucket = "{bucket}"
region = "us-east-1"
# endpoint = "http://127.0.0.1:9000"   # S3-compatible services (MinIO, R2, ...)
# path_style = true
# access_key = "..."                   # otherwise the standard AWS credential chain is used
# secret_key = "..."
timeout_secs = 30

# Remove this section to disable the /generated endpoints
# [generation]
# base_url = "https://api.openai.com/v1"
# api_key = "sk-..."                   # or OPENAI_API_KEY
# text_model = "gpt-3.5-turbo"
# image_model = "dall-e-3"
# speech_model = "tts-1"
# voice = "echo"
# max_tokens = 100
# timeout_secs = 60

[logging]
level = "info"
format = "pretty"         # "pretty" or "json"
"#);

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit the file to configure your bucket and credentials.");
    println!("Then start with: wolffiles --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match WolfFilesConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Bind Address: {}", config.server.bind_address);
            println!("  Backend: {:?}", config.storage.backend);
            println!("  Bucket: {}", config.storage.bucket);
            println!("  Generation: {}", if config.generation.is_some() { "enabled" } else { "disabled" });
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show configuration summary
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = WolfFilesConfig::from_file(&config_path)?;

    println!("WolfFiles Information");
    println!("=====================");
    println!();
    println!("Server:");
    println!("  Bind Address:   {}", config.server.bind_address);
    println!("  CORS:           {}", config.server.cors_enabled);
    println!("  Max Upload:     {} MB", config.server.max_upload_mb);
    println!();
    println!("Storage:");
    println!("  Backend:        {:?}", config.storage.backend);
    if config.storage.backend == BackendKind::S3 {
        println!("  Bucket:         {}", config.storage.bucket);
        println!("  Region:         {}", config.storage.region);
        println!("  Endpoint:       {}", config.storage.endpoint.as_deref().unwrap_or("(AWS default)"));
        println!("  Path Style:     {}", config.storage.path_style);
        println!(
            "  Credentials:    {}",
            if config.storage.access_key.is_some() { "static" } else { "AWS credential chain" }
        );
    }
    println!("  Timeout:        {} s", config.storage.timeout_secs);
    println!();
    match &config.generation {
        Some(generation) => {
            println!("Generation:");
            println!("  Base URL:       {}", generation.base_url);
            println!("  Text Model:     {}", generation.text_model);
            println!("  Image Model:    {}", generation.image_model);
            println!("  Speech Model:   {} ({})", generation.speech_model, generation.voice);
        }
        None => println!("Generation:       disabled"),
    }

    Ok(())
}
