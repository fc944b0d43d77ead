//! shiftdesk command line entry point.
//!
//! Drives the API client from a terminal. Payloads are printed as JSON on
//! stdout; logging goes to stderr so output stays pipeable.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shiftdesk_client::{ApiClient, RequestOptions, auth};
use shiftdesk_core::ClientConfig;
use tracing_subscriber::EnvFilter;

/// Command line client for the shiftdesk time-tracking API
#[derive(Parser, Debug)]
#[command(name = "shiftdesk")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange a pass code for a token and store it
    Login { pass_code: String },

    /// Forget the stored token
    Logout,

    /// Show the signed-in user
    Me,

    /// GET a path, with optional key=value query parameters
    Get {
        path: String,
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Skip the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Send a mutation (POST, PATCH, PUT or DELETE)
    Send {
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

fn parse_method(raw: &str) -> Result<shiftdesk_client::request::Method> {
    let method = raw.to_ascii_uppercase();
    match method.as_str() {
        "POST" | "PATCH" | "PUT" | "DELETE" => Ok(method.parse()?),
        _ => bail!("unsupported method `{raw}`; use `get` for reads"),
    }
}

fn with_params(mut options: RequestOptions, params: Vec<(String, String)>) -> RequestOptions {
    for (key, value) in params {
        options = options.query(key, value);
    }
    options
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    config.require_base_url()?;
    let client = ApiClient::connect(config).await.context("opening client")?;

    match cli.command {
        Command::Login { pass_code } => print(&auth::login(&client, &pass_code).await?)?,
        Command::Logout => auth::logout(&client).await?,
        Command::Me => print(&auth::me(&client).await?)?,
        Command::Get { path, params, no_cache } => {
            let mut options = with_params(RequestOptions::get(), params);
            if no_cache {
                options = options.no_cache();
            }
            print(&client.execute(&path, options).await?)?;
        }
        Command::Send { method, path, body, params } => {
            let body: Value = match body {
                Some(raw) => serde_json::from_str(&raw).context("parsing --body as JSON")?,
                None => Value::Null,
            };
            let options = with_params(RequestOptions::send(parse_method(&method)?, body), params);
            print(&client.execute(&path, options).await?)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    run(Cli::parse()).await
}
