// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info};

use tisk::auth::AuthService;
use tisk::client::ApiClient;
use tisk::config::ClientConfig;
use tisk::model::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use tisk::session::MemoryNavigator;
use tisk::storage::FileStore;
use tisk::tickets::TicketService;
use tisk::transport::ApiRequest;

/// Helpdesk API client with transparent token refresh.
#[derive(Debug, Parser)]
#[command(name = "tisk", version)]
struct Cli {
    #[command(flatten)]
    client: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "TISK_LOG_FORMAT", default_value = "text", global = true)]
    log_format: String,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, env = "TISK_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and persist the session.
    Login {
        #[arg(long, env = "TISK_EMAIL")]
        email: String,
        #[arg(long, env = "TISK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and persist the session.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TISK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        login: String,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        position: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the logged-in user, revalidating the stored session.
    Whoami,
    /// Change the password of the logged-in user.
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// List tickets as JSON.
    Tickets {
        /// Only tickets of the logged-in user.
        #[arg(long)]
        mine: bool,
    },
    /// Send an authenticated request and print the JSON response.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,
        /// Path relative to the API URL, e.g. /tickets/42.
        path: String,
        /// JSON request body.
        #[arg(long)]
        data: Option<String>,
        /// Query parameter as key=value; repeatable.
        #[arg(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    Ok((k.to_owned(), v.to_owned()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = FileStore::open(cli.client.session_path())?;
    let (client, mut events) =
        ApiClient::new(&cli.client, Arc::new(store), Arc::new(MemoryNavigator::default()));
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "session event");
        }
    });
    let auth = AuthService::new(client.clone());

    match cli.command {
        Command::Login { email, password } => {
            let user = auth.login(&LoginRequest { email, password }).await?;
            println!("logged in as {} <{}>", user.display_name(), user.email);
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            login,
            phone_number,
            department,
            position,
        } => {
            let request = RegisterRequest {
                email,
                password,
                first_name,
                last_name,
                login,
                phone_number,
                department,
                position,
            };
            let user = auth.register(&request).await?;
            println!("registered {} <{}>", user.display_name(), user.email);
        }
        Command::Logout => {
            auth.logout();
            println!("logged out");
        }
        Command::Whoami => {
            let Some(user) = auth.restore().await else {
                anyhow::bail!("not logged in");
            };
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::ChangePassword { current, new } => {
            let request = ChangePasswordRequest {
                current_password: current,
                confirm_password: new.clone(),
                new_password: new,
            };
            auth.change_password(&request).await?;
            println!("password changed");
        }
        Command::Tickets { mine } => {
            let service = TicketService::new(client.clone());
            let tickets = if mine { service.mine().await? } else { service.list().await? };
            println!("{}", serde_json::to_string_pretty(&tickets)?);
        }
        Command::Request { method, path, data, query } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request = query
                .into_iter()
                .fold(ApiRequest::new(method, path), |req, (k, v)| req.query(k, v));
            if let Some(data) = data {
                let body: Value = serde_json::from_str(&data)?;
                request = request.json(&body)?;
            }
            let response = client.execute(request).await?;
            match response.json::<Value>() {
                Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                Err(_) => println!("{}", response.text()),
            }
        }
    }
    Ok(())
}
