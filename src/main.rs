mod blog;
mod checkout;
mod config;
mod contact;
mod error;
mod llm;
mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::blog::GenerationClient;
use crate::checkout::{CheckoutService, StripeGateway};
use crate::config::Config;
use crate::contact::{ContactService, Mailer, SmtpMailer};
use crate::error::Result;
use crate::llm::OpenAiEngine;
use crate::server::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.iter().any(|a| a == "--default-config") {
        print!("{}", Config::default_config_contents());
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            return;
        }
    };

    if args.iter().any(|a| a == "--check") {
        run_checks(&config);
        return;
    }

    let state = match build_state(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to initialize functions: {e}");
            return;
        }
    };

    info!(
        bind = %config.bind,
        model = %config.blog.model,
        backend = state.blog.backend_name(),
        "nextwave-functions starting"
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let server_handle = {
        let bind = config.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(&bind, state, shutdown_rx).await {
                error!("server error: {e}");
                std::process::exit(1);
            }
        })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl+c: {e}");
    }

    info!("shutdown signal received, stopping...");
    let _ = shutdown_tx.send(());
    let _ = server_handle.await;
    info!("nextwave-functions stopped");
}

/// Wire every function to its external collaborator.
///
/// Missing credentials are not fatal: the affected function answers with
/// an error until the environment is fixed.
fn build_state(config: &Config) -> Result<AppState> {
    let engine = Arc::new(OpenAiEngine::new(&config.blog)?);
    let openai_key = Config::openai_api_key();
    if openai_key.is_none() {
        warn!("OPENAI_API_KEY not set; blog generation will answer 503");
    }
    let blog = GenerationClient::new(engine, openai_key, &config.blog);

    let gateway = Arc::new(StripeGateway::new(&config.checkout)?);
    let stripe_key = Config::stripe_secret_key();
    if stripe_key.is_none() {
        warn!("STRIPE_SECRET_KEY not set; checkout will answer 503");
    }
    let checkout = CheckoutService::new(gateway, stripe_key, &config.checkout);

    let contact = match config.smtp_settings() {
        Ok(smtp) => {
            let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(
                &smtp,
                Duration::from_secs(config.contact.timeout_secs),
            )?);
            ContactService::new(Some(mailer), smtp.user, config.site_name.clone())
        }
        Err(e) => {
            warn!("contact form disabled: {e}");
            ContactService::new(None, String::new(), config.site_name.clone())
        }
    };

    let bearer_token = Config::functions_bearer_token().map(Arc::<str>::from);
    if bearer_token.is_some() {
        info!("blog generation requires the pinned bearer token");
    }

    Ok(AppState {
        blog: Arc::new(blog),
        checkout: Arc::new(checkout),
        contact: Arc::new(contact),
        bearer_token,
    })
}

fn run_checks(config: &Config) {
    info!("running pre-flight checks...");
    info!("config: OK");
    info!("  bind: {}", config.bind);
    info!("  blog model: {} ({})", config.blog.model, config.blog.base_url);
    info!("  blog timeout: {}s", config.blog.timeout_secs);

    let set = |present: bool| if present { "set" } else { "NOT SET" };

    info!("OPENAI_API_KEY: {}", set(Config::openai_api_key().is_some()));
    info!("STRIPE_SECRET_KEY: {}", set(Config::stripe_secret_key().is_some()));

    match config.smtp_settings() {
        Ok(smtp) => info!("SMTP: OK ({}:{} as {})", smtp.host, smtp.port, smtp.user),
        Err(e) => error!("SMTP: {e}"),
    }

    match Config::functions_bearer_token() {
        Some(_) => info!("FUNCTIONS_BEARER_TOKEN: set (pinned)"),
        None => info!("FUNCTIONS_BEARER_TOKEN: not set (any bearer token accepted)"),
    }
}

fn print_usage() {
    println!(
        "nextwave-functions — HTTP functions for the NextWave marketing site

USAGE:
    nextwave-functions [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/nextwave/config.toml)
    --default-config    Print default config to stdout and exit
    --check             Validate config and report configured credentials, then exit
    -h, --help          Print this help message

ENDPOINTS:
    POST /functions/v1/generate-blog     Generate a markdown blog post
    POST /functions/v1/create-checkout   Create a Stripe checkout session
    POST /functions/v1/send-email        Forward a contact-form message
    GET  /healthz                        Liveness probe

ENVIRONMENT:
    OPENAI_API_KEY          Required for blog generation (503 without it).
    STRIPE_SECRET_KEY       Required for checkout (503 without it).
    SMTP_HOST, SMTP_PORT, SMTP_USER, SMTP_PASS
                            Required for the contact form.
    FUNCTIONS_BEARER_TOKEN  Optional. Bearer token callers must present.
    BIND_ADDR               Optional. Overrides `bind` from the config file.
    RUST_LOG                Optional. Tracing filter (default: info).
"
    );
}
