//! WolfFilesCtl - Command line client for a running WolfFiles server
//!
//! Usage:
//!   wolffilesctl ls [--directory DIR] [--all]   - List files
//!   wolffilesctl get PATH [-o FILE]             - Download a file
//!   wolffilesctl head PATH                      - Show file metadata
//!   wolffilesctl put PATH FILE                  - Upload a file
//!   wolffilesctl rm PATH                        - Delete a file
//!   wolffilesctl generate PATH --prompt ...     - Generate a file
//!   wolffilesctl health                         - Check the server

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;

use wolffiles::api::{FileWriteResponse, HealthResponse};
use wolffiles::config::ServerConfig;
use wolffiles::listing::ListingPage;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// WolfFiles Control Tool
#[derive(Parser)]
#[command(name = "wolffilesctl")]
#[command(about = "Browse and manage files on a WolfFiles server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "wolffiles.toml")]
    config: PathBuf,

    /// API endpoint to connect to (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files
    Ls {
        /// Only list files under this prefix
        #[arg(short, long)]
        directory: Option<String>,
        /// Files per page (1-100)
        #[arg(short = 'n', long)]
        page_size: Option<u32>,
        /// Continue from a token printed by a previous call (it already carries the directory)
        #[arg(short = 't', long, conflicts_with = "directory")]
        page_token: Option<String>,
        /// Follow continuation tokens until every page has been listed
        #[arg(short, long)]
        all: bool,
    },
    /// Download a file (to stdout unless --output is given)
    Get {
        path: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show file metadata
    Head { path: String },
    /// Upload a local file
    Put {
        path: String,
        file: PathBuf,
        /// Content type to store (defaults to application/octet-stream)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a file
    Rm { path: String },
    /// Generate a file from a prompt and store it under generated/
    Generate {
        path: String,
        #[arg(short, long)]
        prompt: String,
        /// Text, Image or Text-to-Speech
        #[arg(short = 'f', long, default_value = "Text")]
        file_type: String,
    },
    /// Check server health
    Health,
}

// ============ Config ============

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
}

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

fn endpoint_from_config(cli: &Cli) -> String {
    let config = std::fs::read_to_string(&cli.config)
        .ok()
        .and_then(|content| toml::from_str::<Config>(&content).ok());

    match config {
        // Convert bind address to localhost if it's 0.0.0.0
        Some(config) => {
            let addr = config.server.bind_address;
            match addr.strip_prefix("0.0.0.0:") {
                Some(port) => format!("http://127.0.0.1:{}", port),
                None => format!("http://{}", addr),
            }
        }
        None => DEFAULT_ENDPOINT.to_string(),
    }
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let endpoint = cli
        .endpoint
        .clone()
        .unwrap_or_else(|| endpoint_from_config(&cli))
        .trim_end_matches('/')
        .to_string();
    let client = reqwest::Client::new();

    let result = match &cli.command {
        Commands::Ls { directory, page_size, page_token, all } => {
            list_files(&client, &endpoint, directory.as_deref(), *page_size, page_token.clone(), *all).await
        }
        Commands::Get { path, output } => get_file(&client, &endpoint, path, output.as_ref()).await,
        Commands::Head { path } => head_file(&client, &endpoint, path).await,
        Commands::Put { path, file, content_type } => {
            put_file(&client, &endpoint, path, file, content_type.as_deref()).await
        }
        Commands::Rm { path } => delete_file(&client, &endpoint, path).await,
        Commands::Generate { path, prompt, file_type } => {
            generate_file(&client, &endpoint, path, prompt, file_type).await
        }
        Commands::Health => health(&client, &endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

async fn api_error(response: reqwest::Response) -> Box<dyn std::error::Error> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("API error: {}", status).into()
    } else {
        format!("API error: {}: {}", status, body).into()
    }
}

fn file_url(endpoint: &str, path: &str) -> String {
    format!("{}/files/{}", endpoint, path.trim_start_matches('/'))
}

async fn list_files(
    client: &reqwest::Client,
    endpoint: &str,
    directory: Option<&str>,
    page_size: Option<u32>,
    mut page_token: Option<String>,
    all: bool,
) -> CliResult {
    let url = format!("{}/files", endpoint);
    let mut total = 0usize;

    println!("{:<50} {:>12}  {}", "PATH", "SIZE", "LAST MODIFIED");
    println!("{}", "-".repeat(90));

    loop {
        let mut query: Vec<(&str, String)> = Vec::new();
        match &page_token {
            // A token already carries the directory filter
            Some(token) => query.push(("page_token", token.clone())),
            None => {
                if let Some(dir) = directory {
                    query.push(("directory", dir.to_string()));
                }
            }
        }
        if let Some(size) = page_size {
            query.push(("page_size", size.to_string()));
        }

        let response = client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let page: ListingPage = response.json().await?;

        for file in &page.files {
            println!(
                "{:<50} {:>12}  {}",
                file.path,
                file.size_bytes,
                file.last_modified.format("%Y-%m-%d %H:%M:%S")
            );
        }
        total += page.files.len();

        match page.next_continuation_token {
            Some(token) if all => page_token = Some(token),
            Some(token) => {
                println!();
                println!("More files available. Continue with: --page-token {}", token);
                break;
            }
            None => break,
        }
    }

    println!();
    println!("{} file(s)", total);
    Ok(())
}

async fn get_file(
    client: &reqwest::Client,
    endpoint: &str,
    path: &str,
    output: Option<&PathBuf>,
) -> CliResult {
    let response = client.get(file_url(endpoint, path)).send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let data = response.bytes().await?;

    match output {
        Some(output) => {
            std::fs::write(output, &data)?;
            eprintln!("Saved {} bytes to {}", data.len(), output.display());
        }
        None => std::io::stdout().write_all(&data)?,
    }
    Ok(())
}

async fn head_file(client: &reqwest::Client, endpoint: &str, path: &str) -> CliResult {
    let response = client.head(file_url(endpoint, path)).send().await?;
    if !response.status().is_success() {
        let reason = response
            .headers()
            .get("error")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        return Err(format!("API error: {} {}", response.status(), reason).into());
    }

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    };

    println!("Path:           {}", path);
    println!("Content-Type:   {}", header("content-type"));
    println!("Content-Length: {}", header("content-length"));
    println!("Last-Modified:  {}", header("last-modified"));
    Ok(())
}

async fn put_file(
    client: &reqwest::Client,
    endpoint: &str,
    path: &str,
    file: &PathBuf,
    content_type: Option<&str>,
) -> CliResult {
    let data = std::fs::read(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let mut part = reqwest::multipart::Part::bytes(data).file_name(file_name);
    if let Some(content_type) = content_type {
        part = part.mime_str(content_type)?;
    }
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client.put(file_url(endpoint, path)).multipart(form).send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    let result: FileWriteResponse = response.json().await?;
    println!("{}", result.message);
    Ok(())
}

async fn delete_file(client: &reqwest::Client, endpoint: &str, path: &str) -> CliResult {
    let response = client.delete(file_url(endpoint, path)).send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    println!("Deleted {}", path);
    Ok(())
}

async fn generate_file(
    client: &reqwest::Client,
    endpoint: &str,
    path: &str,
    prompt: &str,
    file_type: &str,
) -> CliResult {
    let response = client
        .post(generate_url(endpoint, path))
        .query(&[("prompt", prompt), ("file_type", file_type)])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    let result: FileWriteResponse = response.json().await?;
    println!("{}", result.message);
    Ok(())
}

fn generate_url(endpoint: &str, path: &str) -> String {
    format!("{}/files/generated/{}", endpoint, path.trim_start_matches('/'))
}

async fn health(client: &reqwest::Client, endpoint: &str) -> CliResult {
    let response = client.get(format!("{}/health", endpoint)).send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    let health: HealthResponse = response.json().await?;
    println!("Server:      {}", endpoint);
    println!("Healthy:     {}", health.healthy);
    println!("Bucket:      {}", health.bucket);
    println!("Generation:  {}", if health.generation_enabled { "enabled" } else { "disabled" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ls_token_conflicts_with_directory() {
        let parsed = Cli::try_parse_from(["wolffilesctl", "ls", "--directory", "a/", "--page-token", "t"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["wolffilesctl", "ls", "--page-token", "t", "--page-size", "5"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_generate_url() {
        assert_eq!(
            generate_url("http://localhost:8000", "/notes/todo.txt"),
            "http://localhost:8000/files/generated/notes/todo.txt"
        );
    }
}
