use std::io;

use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use agent_connect::auth::AuthClient;
use agent_connect::cli::{Args, Command};
use agent_connect::exchange::build_http_client;
use agent_connect::notify;
use agent_connect::session::ConnectionStatus;
use agent_connect::view::{View, ViewController};
use agent_connect::{
    AppConfig, ConnectionOptions, CredentialRequest, SessionController, SettingsNotifier,
    TokenExchangeClient, WebSocketTransport,
};

/// How long `token` waits for the settings notification before exiting.
const NOTIFY_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn exchange_client(config: &AppConfig) -> Result<TokenExchangeClient, Box<dyn std::error::Error>> {
    let http = build_http_client(config);
    let notifier = SettingsNotifier::from_config(config, http.clone());
    Ok(TokenExchangeClient::with_client(config, http)?.with_notifier(notifier))
}

fn print_view(view: View, config: &AppConfig) {
    match view {
        View::Welcome => eprintln!(
            "{}",
            format!("  [{}] {}", config.company_name, config.start_button_text).bright_blue()
        ),
        View::Session => eprintln!("{}", format!("  [{}] session live", config.page_title).bright_green()),
    }
}

async fn run_token(config: &AppConfig, options: ConnectionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let client = exchange_client(config)?;
    let request = CredentialRequest::build(&config.agent_name, &options);
    let (credential, notification) = client.exchange_tracked(&request).await?;
    let summary = serde_json::json!({
        "serverUrl": credential.server_url,
        "tokenLength": credential.participant_token.len(),
        "tokenPreview": credential.preview(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(handle) = notification {
        notify::settle(handle, NOTIFY_GRACE).await;
    }
    Ok(())
}

async fn run_connect(
    config: &AppConfig,
    mut options: ConnectionOptions,
    login: Option<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some((email, password)) = login {
        let auth = AuthClient::new(config.auth_url.clone());
        if let Some(settings) = auth.login(&email, &password).await? {
            options.seed_from(&settings);
        }
    }

    let controller = SessionController::new(
        config.agent_name.clone(),
        exchange_client(config)?,
        WebSocketTransport::new(config.signal_path.clone()),
    );
    let mut views = ViewController::new(controller.subscribe());
    print_view(views.rendered(), config);

    let ui_config = config.clone();
    let renderer = tokio::spawn(async move {
        while let Some(t) = views.next_transition().await {
            print_view(t.to, &ui_config);
        }
    });

    eprintln!("{}", "  Connecting...".bright_yellow());
    if let Err(e) = controller.connect(&options).await {
        eprintln!("{}", format!("  {e}").bright_red());
        return Err(e.into());
    }
    eprintln!("{}", "  Press Ctrl+C to hang up.".bright_blue());

    let mut status = controller.subscribe();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = status.wait_for(|s| *s == ConnectionStatus::Disconnected) => {
            if let Some(e) = controller.last_error() {
                eprintln!("{}", format!("  transport error: {e}").bright_red());
            }
        }
    }

    controller.disconnect();
    drop(controller);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), renderer).await;
    Ok(())
}

async fn run_whoami(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthClient::new(config.auth_url.clone());
    match auth.session().await? {
        Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
        None => eprintln!("{}", "  Not signed in.".bright_yellow()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.log);

    let config = AppConfig::resolve(args.config.as_deref())?;

    match args.command {
        Command::Token(options) => run_token(&config, options.into()).await,
        Command::Connect {
            options,
            email,
            password,
        } => run_connect(&config, options.into(), email.zip(password)).await,
        Command::Whoami => run_whoami(&config).await,
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "agent-connect", &mut io::stdout());
            Ok(())
        }
    }
}
