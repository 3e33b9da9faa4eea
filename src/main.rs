//! `service-router` command line.
//!
//! Starts an application with the in-memory record service on the local
//! transport and executes one call against it, or prints the route tree.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use service_router::config::{load_config, AppConfig};
use service_router::observability::{init_logging, init_metrics};
use service_router::service::MemoryService;
use service_router::{
    action, App, Application, Id, LocalTransport, Method, Params, RequestContext, ServiceApi,
    ServiceCall,
};

#[derive(Parser)]
#[command(name = "service-router")]
#[command(about = "Dispatch CRUD and action calls through a local service application", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a service verb
    Call {
        /// Service location
        #[arg(short, long, default_value = "records")]
        service: String,
        /// find, get, create, update, patch or remove
        #[arg(short, long)]
        method: Method,
        /// Record id; `null` targets every record
        #[arg(long)]
        id: Option<String>,
        /// JSON payload for create/update/patch
        #[arg(long)]
        data: Option<String>,
        /// JSON params, e.g. '{"query":{"$action":"count"}}'
        #[arg(long)]
        params: Option<String>,
        /// JSON array of records to create before the call
        #[arg(long)]
        seed: Option<String>,
    },
    /// Print the route tree
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    init_logging(&config.observability);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = build(&config)?;

    match cli.command {
        Commands::Routes => {
            print!("{}", app.router().root());
        }
        Commands::Call {
            service,
            method,
            id,
            data,
            params,
            seed,
        } => {
            let client = app.service(&service);
            if let Some(seed) = seed {
                client.create(serde_json::from_str(&seed)?, Params::new()).await?;
            }

            let id = id.map(|id| if id == "null" { Id::All } else { Id::Key(id) });
            let data = data.map(|d| serde_json::from_str::<Value>(&d)).transpose()?;
            let params: Params = match params {
                Some(p) => serde_json::from_str(&p)?,
                None => Params::new(),
            };

            match client.call(method, ServiceCall::new(id, data, params)).await {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(e) => {
                    let body = json!({ "status": e.status(), "kind": e.kind(), "message": e.to_string() });
                    eprintln!("{}", serde_json::to_string_pretty(&body)?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn build(config: &AppConfig) -> Result<App<LocalTransport>, Box<dyn std::error::Error>> {
    let app = Application::from_config(LocalTransport::from_config(&config.transport), config)
        .service("records", MemoryService::new())
        .use_route(
            "*",
            action(|ctx: RequestContext| async move {
                tracing::info!(
                    path = %ctx.path,
                    cmd = ?ctx.metadata.get("cmd"),
                    "Incoming service request"
                );
                Ok(None)
            }),
        )
        .use_route(
            "/error",
            action(|ctx: RequestContext| async move {
                if let Some(e) = &ctx.error {
                    tracing::warn!(status = e.status(), error = %e, "Request failed in middleware");
                }
                Ok(None)
            }),
        )
        .start()?;
    Ok(app)
}
