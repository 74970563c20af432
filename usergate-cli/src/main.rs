//! usergate CLI - run and inspect the bearer-gated user API

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use usergate_core::routes::DEFAULT_PROTECTED_PREFIX;
use usergate_core::{BearerGate, Method, Operation, RouteTable, UsergateConfig};

#[derive(Parser)]
#[command(name = "usergate")]
#[command(about = "usergate - CRUD user API behind a static bearer token")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overrides the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the route table
    Routes {
        /// Protected prefix the user routes live under
        #[arg(long, default_value = DEFAULT_PROTECTED_PREFIX)]
        prefix: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show which operation a request would dispatch to
    Resolve {
        /// HTTP method
        method: String,

        /// Request path
        path: String,

        /// Protected prefix the user routes live under
        #[arg(long, default_value = DEFAULT_PROTECTED_PREFIX)]
        prefix: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Run an Authorization header value through the gate
    Check {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Token to check against instead of the configured one
        #[arg(short, long)]
        token: Option<String>,

        /// Header value, e.g. "Bearer abc"; omitted means no header
        header: Option<String>,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct Resolution {
    method: Method,
    path: String,
    protected: bool,
    operation: Option<Operation>,
    params: BTreeMap<String, String>,
    allowed: Vec<Method>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve { .. }) {
        usergate_server::tracing::init_console()?;
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("usergate=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Serve { config, bind } => serve_command(config, bind).await?,
        Commands::Routes { prefix, format } => routes_command(prefix, format)?,
        Commands::Resolve {
            method,
            path,
            prefix,
            format,
        } => resolve_command(method, path, prefix, format)?,
        Commands::Check {
            config,
            token,
            header,
        } => check_command(config, token, header)?,
        Commands::Validate { file } => validate_command(file)?,
    }

    Ok(())
}

async fn serve_command(config: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut config = UsergateConfig::load(config.as_deref())?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
        config.validate()?;
    }

    usergate_server::metrics::init_prometheus()?;
    usergate_server::metrics::init_metrics();

    tracing::info!("Starting usergate v{}", env!("CARGO_PKG_VERSION"));
    usergate_server::serve(config).await
}

fn routes_command(prefix: String, format: Format) -> Result<()> {
    let table = RouteTable::users(prefix)?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(table.routes())?);
        }
        Format::Text => {
            println!("{} Routes under {}", "═".blue().bold(), table.protected_prefix());
            for route in table.routes() {
                println!(
                    "{} {:<7} {:<32} {}",
                    "▸".blue(),
                    route.method.as_str(),
                    route.template.as_str(),
                    route.operation
                );
            }
        }
    }

    Ok(())
}

fn resolve_command(method: String, path: String, prefix: String, format: Format) -> Result<()> {
    let table = RouteTable::users(prefix)?;
    let method: Method = method.parse()?;
    let matched = table.resolve(method, &path);

    let resolution = Resolution {
        method,
        protected: table.is_protected(&path),
        operation: matched.as_ref().map(|m| m.operation),
        params: matched.map(|m| m.params).unwrap_or_default(),
        allowed: table.allowed_methods(&path),
        path,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        Format::Text => print_resolution(&resolution),
    }

    if resolution.operation.is_none() {
        bail!("no route for {} {}", resolution.method, resolution.path);
    }
    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    println!(
        "{} {} {}",
        "→".blue(),
        resolution.method.as_str(),
        resolution.path
    );
    println!(
        "{} Protected: {}",
        "▸".blue(),
        if resolution.protected { "yes" } else { "no" }
    );

    match resolution.operation {
        Some(operation) => {
            println!("{} Operation: {}", "▸".blue(), operation.as_str().green());
            for (name, value) in &resolution.params {
                println!("{} {} = {}", "▸".blue(), name, value);
            }
        }
        None if resolution.allowed.is_empty() => {
            println!("{} Operation: {}", "▸".blue(), "none (404)".red());
        }
        None => {
            let allowed: Vec<&str> = resolution.allowed.iter().map(|m| m.as_str()).collect();
            println!("{} Operation: {}", "▸".blue(), "none (405)".red());
            println!("{} Allowed: {}", "▸".blue(), allowed.join(", "));
        }
    }
}

fn check_command(config: Option<PathBuf>, token: Option<String>, header: Option<String>) -> Result<()> {
    let gate = match token {
        Some(token) => BearerGate::new(token)?,
        None => UsergateConfig::load(config.as_deref())?.gate()?,
    };

    match gate.check(header.as_deref()) {
        Ok(()) => {
            println!("{} ALLOWED", "✓".green());
            Ok(())
        }
        Err(rejection) => {
            println!("{} DENIED ({})", "✗".red(), rejection.as_str());
            println!("  {}", rejection);
            bail!("request would be rejected with 401");
        }
    }
}

fn validate_command(file: PathBuf) -> Result<()> {
    println!("{} Validating {}...", "→".blue(), file.display());

    let mut config = UsergateConfig::from_file(&file)
        .with_context(|| format!("Failed to read configuration: {}", file.display()))?;

    // Validate what `serve` would see, environment overrides included
    let checked = config
        .apply_overrides(|key| std::env::var(key).ok())
        .and_then(|()| config.validate());

    match checked {
        Ok(()) => {
            println!("{} Configuration is valid!", "✓".green());
            println!("  Bind address: {}", config.server.bind_address);
            println!("  Protected prefix: {}", config.auth.protected_prefix);
            println!("  Debug: {}", config.server.debug);
        }
        Err(e) => {
            println!("{} Configuration is invalid:", "✗".red());
            println!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
