use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storechat_client::{
    ChatSession, ClientConfig, HttpBackend, SendOutcome, StreamObserver,
};
use storechat_config::{Config, ConfigManager};
use storechat_core::{display_label, IntentKind, MessageId};
use storechat_observability::{create_command_span, Observability};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Instrument;

#[derive(Parser)]
#[command(name = "storechat")]
#[command(about = "Chat with your store's AI assistant")]
#[command(version)]
struct Cli {
    /// Backend base URL, overrides api.base_url
    #[arg(long, env = "STORECHAT_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token, overrides the variable named by api.token_env
    #[arg(long, env = "STORECHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Config file path
    #[arg(long, env = "STORECHAT_CONFIG", default_value = "~/.storechat/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动交互式聊天
    Chat,
    /// 发送单条消息
    Send {
        /// 消息内容
        message: String,
    },
    /// 查询剩余额度
    Credits,
    /// 列出支持的意图
    Intents,
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: api.base_url, chat.initial_credits)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: api.base_url, chat.initial_credits)
        key: String,
        /// 配置值
        value: String,
    },
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 显示当前配置
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path =
        storechat_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    if let Commands::Config(args) = &cli.command {
        return handle_config(args.clone(), &config_path).await;
    }
    if let Commands::Intents = cli.command {
        print_intents();
        return Ok(());
    }

    let manager = ConfigManager::load(&config_path).await?;
    let config = manager.snapshot().await;

    let mut log_config = storechat_observability::Config::from(&config);
    if cli.debug {
        log_config = log_config
            .with_log_level("debug")
            .with_module_level("hyper", "info")
            .with_module_level("reqwest", "info");
    }
    let observability = Observability::init(log_config)?;

    let session = build_session(&cli, &config)?;
    let span = storechat_observability::create_session_span(&session.backend().config().base_url);

    let result = async {
        match cli.command {
            Commands::Chat => run_interactive_chat(&session, &observability).await,
            Commands::Send { message } => {
                send_once(&session, &message)
                    .instrument(create_command_span("send"))
                    .await
            }
            Commands::Credits => {
                show_credits(&session)
                    .instrument(create_command_span("credits"))
                    .await
            }
            Commands::Intents | Commands::Config(_) => Ok(()),
        }
    }
    .instrument(span)
    .await;

    observability.shutdown()?;
    result
}

fn build_session(cli: &Cli, config: &Config) -> anyhow::Result<ChatSession<HttpBackend>> {
    let api = &config.api;
    let base_url = cli.base_url.clone().unwrap_or_else(|| api.base_url.clone());

    let mut client_config = ClientConfig::new(base_url)
        .with_chat_path(api.chat_path.clone())
        .with_tokens_path(api.tokens_path.clone());
    if let Some(seconds) = api.timeout_seconds {
        client_config = client_config.with_timeout(Duration::from_secs(seconds));
    }
    for (key, value) in &api.headers {
        client_config = client_config.with_header(key.clone(), value.clone());
    }

    let backend = match cli.token.clone().or_else(|| api.token()) {
        Some(token) => HttpBackend::with_bearer(client_config, token)?,
        None => {
            tracing::warn!("no token found in {}, sending unauthenticated requests", api.token_env);
            HttpBackend::without_auth(client_config)?
        }
    };

    Ok(ChatSession::new(backend, config.chat.initial_credits))
}

async fn handle_config(args: ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    anyhow::bail!("Key not found or unset: {}", key);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(config_path).await?;
            manager
                .update(|config| config.set_value(&key, &value))
                .await
                .with_context(|| format!("Failed to set {}", key))?;
            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("{}", format!("⚠️  Config already exists at {:?}", config_path).yellow());
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            // 初始化目录
            storechat_config::init_storechat_dirs().await?;

            let manager = ConfigManager::new(Config::default(), config_path.to_path_buf());
            manager.save().await?;

            println!("{}", format!("✅ Config initialized at {:?}", config_path).green());
            println!("{}", "You can edit this file to customize your settings".dimmed());
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Prints only the part of the running reply that is new since the last call
#[derive(Default)]
struct LiveRenderer {
    printed: usize,
}

impl StreamObserver for LiveRenderer {
    fn on_text(&mut self, text: &str) {
        if let Some(delta) = text.get(self.printed..) {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
        self.printed = text.len();
    }
}

/// Send one message, stopping the turn on Ctrl-C
async fn send_and_render(
    session: &ChatSession<HttpBackend>,
    text: &str,
) -> anyhow::Result<SendOutcome> {
    let mut renderer = LiveRenderer::default();
    print!("{} ", "Assistant:".green().bold());
    io::stdout().flush()?;

    let outcome = {
        let send = session.send_message_with(text, &mut renderer);
        tokio::pin!(send);

        loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    session.stop();
                }
            }
        }
    };

    render_outcome(session, &outcome, renderer.printed > 0);
    Ok(outcome)
}

fn render_outcome(session: &ChatSession<HttpBackend>, outcome: &SendOutcome, streamed: bool) {
    let state = session.snapshot();
    let find = |id: &MessageId| state.messages().iter().find(|m| m.id == *id);

    match outcome {
        SendOutcome::Replied { message_id } => {
            let Some(message) = find(message_id) else {
                println!();
                return;
            };
            if !streamed {
                print!("{}", message.text);
            }
            println!();
            let intent = message
                .intent
                .as_deref()
                .map(|label| format!("{} · ", display_label(label)))
                .unwrap_or_default();
            println!(
                "{}",
                format!("{}{} credits left", intent, state.token_credits()).dimmed()
            );
        }
        SendOutcome::Failed { message_id } => {
            if streamed {
                println!();
            }
            if let Some(message) = find(message_id) {
                println!("{}", format!("❌ {}", message.text).red());
            }
        }
        SendOutcome::QuotaExceeded => {
            println!();
            println!("{}", "⚠️  You're out of credits.".yellow().bold());
            println!(
                "{}",
                "Purchase more credits from your dashboard to keep chatting.".yellow()
            );
        }
        SendOutcome::Cancelled => {
            println!();
            println!("{}", "(stopped)".dimmed());
        }
        SendOutcome::Ignored => println!(),
    }
}

async fn send_once(session: &ChatSession<HttpBackend>, message: &str) -> anyhow::Result<()> {
    match send_and_render(session, message).await? {
        SendOutcome::Replied { .. } | SendOutcome::Cancelled => Ok(()),
        SendOutcome::Ignored => anyhow::bail!("Message is empty"),
        SendOutcome::QuotaExceeded => anyhow::bail!("Insufficient credits"),
        SendOutcome::Failed { .. } => anyhow::bail!("Request failed"),
    }
}

async fn show_credits(session: &ChatSession<HttpBackend>) -> anyhow::Result<()> {
    match session.refresh_credits().await? {
        Some(credits) => println!("{}", format!("💳 {} credits remaining", credits).green()),
        None => println!("{}", "The backend did not report a balance".yellow()),
    }
    Ok(())
}

fn print_intents() {
    println!("{}", "🧭 Supported intents:".cyan().bold());
    for kind in IntentKind::ALL {
        println!();
        println!("{} {}", kind.title().bold(), format!("({})", kind.as_str()).dimmed());
        println!("  {}", kind.description());
        for action in kind.actions() {
            println!("  {} {}", "•".dimmed(), action.label);
        }
    }
}

/// What the REPL should do with one line of input
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Skip,
    Quit,
    Clear,
    Credits,
    Intents,
    LogLevel(&'a str),
    Send(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Skip,
            "/quit" | "/exit" | "exit" | "quit" => Self::Quit,
            "/clear" => Self::Clear,
            "/credits" => Self::Credits,
            "/intents" => Self::Intents,
            input => match input.strip_prefix("/log ") {
                Some(level) => Self::LogLevel(level.trim()),
                None => Self::Send(input),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Quit => "quit",
            Self::Clear => "clear",
            Self::Credits => "credits",
            Self::Intents => "intents",
            Self::LogLevel(_) => "log",
            Self::Send(_) => "send",
        }
    }
}

async fn run_interactive_chat(
    session: &ChatSession<HttpBackend>,
    observability: &Observability,
) -> anyhow::Result<()> {
    println!("{}", "🛍️  Store Assistant".cyan().bold());
    println!(
        "{}",
        format!("Backend: {}", session.backend().config().base_url).dimmed()
    );
    println!(
        "{}",
        "Commands: /clear, /credits, /intents, /log <level>, /quit. Ctrl-C stops a reply."
            .dimmed()
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        // ctrl_c() keeps SIGINT after its first poll; the idle prompt must exit on it.
        let line = tokio::select! {
            line = lines.next_line() => line?,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = ReplCommand::parse(&line);
        let span = create_command_span(command.name());
        match command {
            ReplCommand::Skip => continue,
            ReplCommand::Quit => break,
            ReplCommand::Clear => {
                let _enter = span.enter();
                session.clear();
                println!("{}", "🧹 Conversation cleared".dimmed());
            }
            ReplCommand::Credits => {
                if let Err(e) = show_credits(session).instrument(span).await {
                    println!("{}", format!("❌ Could not refresh credits: {}", e).red());
                }
            }
            ReplCommand::Intents => print_intents(),
            ReplCommand::LogLevel(level) => {
                let _enter = span.enter();
                match observability.update_log_level(level) {
                    Ok(()) => println!("{}", format!("🔧 Log level set to {}", level).dimmed()),
                    Err(e) => println!("{}", format!("❌ {}", e).red()),
                }
            }
            ReplCommand::Send(input) => {
                if let Err(e) = send_and_render(session, input).instrument(span).await {
                    println!("{}", format!("❌ Error: {}", e).red());
                }
            }
        }
        println!();
    }

    println!("{}", "👋 Goodbye!".cyan());
    Ok(())
}
