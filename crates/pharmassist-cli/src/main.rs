use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pharmassist_client::{ChatError, ChatSession};
use pharmassist_core::{LangMode, PharmAssistConfig};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod render;
mod terminal;

use terminal::TerminalHandler;

#[derive(Parser)]
#[command(name = "pharmassist", version)]
#[command(about = "Terminal chat client for the pharmacy assistant")]
struct Cli {
    /// Config file (default: $PHARMASSIST_CONFIG or ~/.pharmassist/pharmassist.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Chat server base URL, overrides the config
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Send one message, print the reply and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Print tool calls and results
    #[arg(long)]
    show_tools: bool,

    /// Email or phone used for prescription lookups
    #[arg(long)]
    identifier: Option<String>,

    /// Reply language: auto, en or he
    #[arg(long)]
    lang: Option<LangMode>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the chat server is up
    Health,
}

/// Per-session front-end settings that are not part of the request.
struct ChatOptions {
    show_tools: bool,
    lang_mode: Option<LangMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pharmassist_cli=info,pharmassist_client=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // explicit path > PHARMASSIST_CONFIG env > ~/.pharmassist/pharmassist.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("PHARMASSIST_CONFIG").ok());
    let mut config = PharmAssistConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        PharmAssistConfig::default()
    });

    if let Some(url) = &cli.base_url {
        config.endpoint.base_url = url.clone();
    }
    if cli.identifier.is_some() {
        config.client.user_identifier = cli.identifier.clone();
    }
    if cli.lang.is_some() {
        config.client.lang_mode = cli.lang;
    }

    let mut session = ChatSession::from_config(&config)?;
    info!(url = %session.transport().chat_url(), "pharmassist ready");

    if let Some(Command::Health) = cli.command {
        return health(&session).await;
    }

    let options = ChatOptions {
        show_tools: cli.show_tools || config.client.show_tool_events,
        lang_mode: config.client.lang_mode,
    };

    match cli.message {
        Some(message) => one_shot(&mut session, &options, &message).await,
        None => {
            repl(&mut session, &options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn health(session: &ChatSession) -> anyhow::Result<ExitCode> {
    match session.transport().health().await {
        Ok(health) => {
            println!("{} {} ({})", health.service, health.version, health.status);
            Ok(if health.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            println!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn one_shot(
    session: &mut ChatSession,
    options: &ChatOptions,
    message: &str,
) -> anyhow::Result<ExitCode> {
    if render::is_prescription_query(message) && session.user_identifier().is_none() {
        warn!("prescription query without an identifier; pass --identifier to look up records");
    }
    match chat_turn(session, options, message).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(ChatError::EmptyMessage) => {
            println!("Error: {}", ChatError::EmptyMessage);
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn repl(session: &mut ChatSession, options: &ChatOptions) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut asked_identifier = false;

    println!("Pharmacy assistant. Type /quit to exit.");
    loop {
        let Some(line) = prompt(&mut lines, "> ").await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }

        if !asked_identifier
            && session.user_identifier().is_none()
            && render::is_prescription_query(text)
        {
            asked_identifier = true;
            let answer = prompt(
                &mut lines,
                "To look up your prescriptions, enter your email or phone (blank to skip): ",
            )
            .await?;
            session.set_user_identifier(answer);
        }

        match chat_turn(session, options, text).await {
            Ok(()) | Err(ChatError::Cancelled) => {}
            Err(e) => info!(error = %e, "turn ended with an error"),
        }
    }
    Ok(())
}

/// Print `label` and wait for a line. `None` on EOF or Ctrl-C.
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = tokio::signal::ctrl_c() => {
            println!();
            Ok(None)
        }
    }
}

/// Stream one reply to stdout. Ctrl-C cancels the call and leaves the
/// conversation without an assistant message.
async fn chat_turn(
    session: &mut ChatSession,
    options: &ChatOptions,
    text: &str,
) -> Result<(), ChatError> {
    let rtl = render::reply_is_rtl(options.lang_mode, text);
    let mut handler = TerminalHandler::new(std::io::stdout(), options.show_tools, rtl);

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    handler.begin();
    let result = session.send_with_cancel(text, &mut handler, &cancel).await;
    watcher.abort();
    handler.finish();

    match result {
        Ok(outcome) => {
            if outcome.reply.is_none() && outcome.malformed > 0 {
                warn!(malformed = outcome.malformed, "reply contained only unreadable records");
            }
            Ok(())
        }
        Err(ChatError::Cancelled) => {
            println!("(cancelled)");
            Err(ChatError::Cancelled)
        }
        Err(e) => Err(e),
    }
}
