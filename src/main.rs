//! Static-S3
//!
//! Command-line entry point: publish static assets to S3, check the URLs
//! templates will get, or preview the static mounts locally.

use std::path::PathBuf;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use static_s3::config::Settings;
use static_s3::sync::{self, SyncOptions, TerminalPrompt};
use static_s3::urls::{RouteTable, UrlBuilder, UrlParams, UrlRewriter};
use static_s3::web::WebState;

/// Publish static assets to S3 and point asset URLs at the bucket
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration directory (default.toml, local.toml)
    #[arg(long, env = "CONFIG_PATH", default_value = "config", global = true)]
    config_dir: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect all static files into the bucket
    Sync(SyncArgs),

    /// Print the URL a template gets for an endpoint
    Resolve(ResolveArgs),

    /// Serve the static mounts locally
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Do not ask for confirmation
    #[arg(short = 'n', long)]
    no_input: bool,

    /// Reserved; accepted but not applied
    #[arg(short, long, value_name = "PATTERN")]
    ignore: Option<String>,

    /// Delete every file in the bucket instead of uploading
    #[arg(short, long)]
    clear: bool,

    /// Print what would happen without touching the bucket
    #[arg(short, long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Endpoint name (`static`, `admin.static`)
    endpoint: String,

    /// File path below the static folder
    #[arg(short, long)]
    filename: Option<String>,

    /// Extra query parameters
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// URL fragment
    #[arg(short, long)]
    anchor: Option<String>,

    /// Resolve as if remote URLs were enabled
    #[arg(long)]
    remote: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "static_s3=info",
        1 => "static_s3=debug",
        _ => "static_s3=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("STATIC_S3_LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.compact().with_target(false).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load_from(&cli.config_dir)
        .with_context(|| format!("loading configuration from {}", cli.config_dir.display()))?;

    match cli.command {
        Commands::Sync(args) => run_sync(&settings, args).await,
        Commands::Resolve(args) => run_resolve(&settings, args),
        Commands::Serve(args) => run_serve(settings, args).await,
    }
}

async fn run_sync(settings: &Settings, args: SyncArgs) -> anyhow::Result<()> {
    let options = SyncOptions {
        no_input: args.no_input,
        ignore: args.ignore,
        clear: args.clear,
        dry_run: args.dry_run,
    };

    let mut stdout = std::io::stdout();
    let report = sync::run_from_settings(settings, &options, &TerminalPrompt, &mut stdout)
        .await
        .context("static file sync failed")?;

    if !report.declined {
        println!("{}", report);
    }
    Ok(())
}

fn run_resolve(settings: &Settings, args: ResolveArgs) -> anyhow::Result<()> {
    let mounts = settings.mounts();
    let mut config = settings.sync_config();
    config.enable_remote_urls |= args.remote;

    let native = RouteTable::from_mounts(&mounts);
    let rewriter = UrlRewriter::new(config, &mounts);

    let mut params = args
        .params
        .into_iter()
        .fold(UrlParams::new(), |params, (k, v)| params.with(k, v));
    if let Some(filename) = args.filename {
        params = params.with(static_s3::urls::FILENAME_PARAM, filename);
    }
    if let Some(anchor) = args.anchor {
        params = params.anchor(anchor);
    }

    let url = rewriter.with_native(&native).build_url(&args.endpoint, &params)?;
    println!("{}", url);
    Ok(())
}

async fn run_serve(settings: Settings, args: ServeArgs) -> anyhow::Result<()> {
    let host = args.host.unwrap_or_else(|| settings.server.host.clone());
    let port = args.port.unwrap_or(settings.server.port);
    let bind_addr = format!("{}:{}", host, port);

    let mounts = settings.mounts();
    let rewriter = UrlRewriter::new(settings.sync_config(), &mounts);
    let state = web::Data::new(WebState::new(mounts.clone(), rewriter));

    info!(
        "Serving {} static mounts on {} (remote urls: {})",
        mounts.len(),
        bind_addr,
        state.rewriter.is_enabled()
    );

    HttpServer::new(move || {
        let mounts = mounts.clone();
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .configure(move |cfg| static_s3::web::configure(cfg, &mounts))
    })
    .workers(1)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
