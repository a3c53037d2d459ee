//! CLI entry point for autoagent

use anyhow::{Context, Result};
use autoagent_client::{ChatSession, History, SendOutcome, SyncOutcome};
use autoagent_core::config::{Config, ConfigLoader, SyncMode};
use autoagent_core::conversation::Conversation;
use autoagent_core::logging::init_logging;
use autoagent_core::settings::{Settings, SettingsForm};
use autoagent_core::storage::{FileStorage, Storage};
use autoagent_core::utils::{expand_tilde, truncate_chars};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

mod terminal;

use terminal::TerminalView;

#[derive(Parser)]
#[command(name = "autoagent")]
#[command(about = "Terminal client for the LLM Auto Agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file interactively
    Init,
    /// Send a message in the current conversation
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Conversation to send in; becomes the current one
        #[arg(short = 'C', long)]
        conversation: Option<String>,
    },
    /// Start an interactive chat
    Repl,
    /// Start a new conversation
    New,
    /// List conversations
    List,
    /// Select a conversation and show its messages
    Switch { id: String },
    /// Show the current conversation
    Show,
    /// Give a conversation a new title
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
    /// Delete every conversation
    Clear,
    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Import a file into the agent's knowledge base
    Upload { path: PathBuf },
    /// Show configuration and backend status
    Status,
    /// Show history stored on the server
    History {
        /// Show one conversation's messages instead of the list
        #[arg(short = 'C', long)]
        conversation: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the local settings
    Show,
    /// Edit settings and sync them to the backend
    Set,
    /// Show the settings the backend holds
    Fetch,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Err(e) if already_reported(&e) => std::process::exit(1),
        result => result,
    }
}

/// True for errors the session already showed the user through the view
///
/// Only an unwrapped session error counts; added context means it came from
/// somewhere else, such as loading the configuration.
fn already_reported(e: &anyhow::Error) -> bool {
    e.chain()
        .next()
        .and_then(|outer| outer.downcast_ref::<autoagent_core::Error>())
        .is_some_and(autoagent_core::Error::is_user_facing)
}

async fn run(cli: Cli) -> Result<()> {
    let loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Init = cli.command {
        return run_init(&loader);
    }

    let config = loader.load().context("Failed to load configuration")?;
    let _log_guard = init_logging(&config.logging);

    let view = Arc::new(TerminalView::new());
    let session = open_session(&config, view.clone())?;

    match cli.command {
        Commands::Init => {}
        Commands::Chat {
            message,
            conversation,
        } => {
            if let Some(id) = conversation {
                if !session.switch_to(&id)? {
                    anyhow::bail!("No conversation with id {}", id);
                }
            }
            view.unmute();
            run_chat(&session, &message).await?;
        }
        Commands::Repl => {
            view.unmute();
            run_repl(&session).await?;
        }
        Commands::New => {
            let id = session.create_conversation().await?;
            println!("Started conversation {}", style(id).cyan());
        }
        Commands::List => print_conversations(&session),
        Commands::Switch { id } => {
            view.unmute();
            if !session.switch_to(&id)? {
                anyhow::bail!("No conversation with id {}", id);
            }
        }
        Commands::Show => {
            view.unmute();
            let current = session.current();
            session.switch_to(&current.id)?;
        }
        Commands::Rename { id, title } => {
            session.rename(&id, &title)?;
            println!("Renamed {} to {}", style(&id).cyan(), style(title.trim()).bold());
        }
        Commands::Delete { id } => {
            session.delete_conversation(&id)?;
            println!("Deleted {}", style(&id).cyan());
        }
        Commands::Clear => {
            if session.clear_all()? {
                println!("{}", style("All conversations cleared.").green());
            } else {
                println!("Nothing changed.");
            }
        }
        Commands::Settings { command } => match command {
            SettingsCommands::Show => print_settings(&session.settings()),
            SettingsCommands::Set => run_settings_set(&session).await?,
            SettingsCommands::Fetch => {
                let remote = session.fetch_remote_settings().await?;
                println!("{}", style("Server settings").bold());
                print_settings(&remote);
            }
        },
        Commands::Upload { path } => {
            session.upload_file(&path).await?;
        }
        Commands::Status => run_status(&loader, &config, &session).await,
        Commands::History { conversation } => {
            let history = session.remote_history(conversation.as_deref()).await?;
            print_history(&history);
        }
    }

    Ok(())
}

/// Open the chat session over the configured storage directory
fn open_session(config: &Config, view: Arc<TerminalView>) -> autoagent_core::Result<ChatSession> {
    let storage_dir = expand_tilde(&config.storage.dir);
    debug!("Using storage at {}", storage_dir.display());
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&storage_dir));
    ChatSession::open(config.client.clone(), storage, view)
}

fn run_init(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to autoagent!").bold().cyan());
    println!("Let's point the client at your agent backend.\n");

    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();
    config.client.base_url = Input::new()
        .with_prompt("Backend URL")
        .default(config.client.base_url.clone())
        .interact_text()?;

    let modes = ["settings (POST /api/settings)", "initialize (POST /api/initialize)"];
    let mode = Select::new()
        .with_prompt("How does the backend receive settings?")
        .items(&modes)
        .default(0)
        .interact()?;
    config.client.sync_mode = if mode == 1 {
        SyncMode::Initialize
    } else {
        SyncMode::Settings
    };

    config.client.upload_endpoint = Input::new()
        .with_prompt("Import endpoint")
        .default(config.client.upload_endpoint.clone())
        .interact_text()?;
    config.client.show_reasoning = Confirm::new()
        .with_prompt("Show reasoning steps and tools used?")
        .default(false)
        .interact()?;

    loader.save(&config)?;
    std::fs::create_dir_all(expand_tilde(&config.storage.dir))?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nNext:");
    println!("  {} - Enter your API key", style("autoagent settings set").cyan());
    println!("  {} - Start chatting", style("autoagent repl").cyan());

    Ok(())
}

async fn run_chat(session: &ChatSession, message: &str) -> Result<()> {
    match session.send_message(message).await? {
        SendOutcome::Ignored => println!("Nothing to send."),
        SendOutcome::Replied(_) => {}
        SendOutcome::Failed(_) => anyhow::bail!("The agent did not answer"),
    }
    Ok(())
}

async fn run_repl(session: &ChatSession) -> Result<()> {
    println!("{}", style("autoagent interactive chat").bold().cyan());
    println!("Type a message, or {} for commands.\n", style("/help").cyan());

    let current = session.current();
    session.switch_to(&current.id)?;

    loop {
        let line: String = Input::new()
            .with_prompt(style("you").green().bold().to_string())
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match run_repl_command(session, command).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => print_error(&e),
            }
            continue;
        }

        if let Err(e) = session.send_message(line).await {
            print_error(&e);
        }
    }

    println!("Bye.");
    Ok(())
}

/// Run one slash command; returns true when the user asked to leave
async fn run_repl_command(session: &ChatSession, command: &str) -> autoagent_core::Result<bool> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    info!("REPL command: {}", name);

    match name {
        "quit" | "exit" | "q" => return Ok(true),
        "help" | "h" => print_repl_help(),
        "new" => {
            session.create_conversation().await?;
        }
        "list" | "ls" => print_conversations(session),
        "switch" | "s" if !arg.is_empty() => {
            if !session.switch_to(arg)? {
                println!("No conversation with id {}", arg);
            }
        }
        "rename" if !arg.is_empty() => {
            let current = session.current();
            session.rename(&current.id, arg)?;
        }
        "delete" | "rm" => {
            let id = if arg.is_empty() {
                session.current().id
            } else {
                arg.to_string()
            };
            session.delete_conversation(&id)?;
        }
        "clear" => {
            session.clear_all()?;
        }
        "upload" if !arg.is_empty() => {
            session.upload_file(Path::new(arg)).await?;
        }
        "history" => {
            let conversation = (!arg.is_empty()).then_some(arg);
            print_history(&session.remote_history(conversation).await?);
        }
        _ => println!(
            "Unknown command /{}. Type {} for the list.",
            command,
            style("/help").cyan()
        ),
    }
    Ok(false)
}

fn print_repl_help() {
    println!("{}", style("Commands").bold());
    for (usage, help) in [
        ("/new", "start a new conversation"),
        ("/list", "list conversations"),
        ("/switch <id>", "select a conversation"),
        ("/rename <title>", "rename the current conversation"),
        ("/delete [id]", "delete a conversation (default: current)"),
        ("/clear", "delete every conversation"),
        ("/upload <path>", "import a file into the knowledge base"),
        ("/history [id]", "show history stored on the server"),
        ("/quit", "leave"),
    ] {
        println!("  {:<18} {}", style(usage).cyan(), help);
    }
}

fn print_error(e: &autoagent_core::Error) {
    // User-facing errors were already reported through the view.
    if !e.is_user_facing() {
        eprintln!("{} {}", style("✗").red(), e);
    }
}

fn print_conversations(session: &ChatSession) {
    let current = session.current();
    for conversation in session.conversations() {
        let marker = if conversation.id == current.id {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!(
            "{} {:<22} {:<24} {}",
            marker,
            style(&conversation.id).cyan(),
            conversation.title,
            style(describe(&conversation)).dim()
        );
    }
}

fn describe(conversation: &Conversation) -> String {
    let created = conversation
        .created_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M");
    format!("{} message(s), created {}", conversation.messages.len(), created)
}

fn print_settings(settings: &Settings) {
    let key = if settings.has_api_key() {
        style(settings.masked_api_key()).green()
    } else {
        style("not configured".to_string()).red()
    };
    println!("  API key: {}", key);
    println!("  Use database: {}", settings.use_database);
    if settings.use_database {
        let db = &settings.database;
        println!("  Database: {}@{}:{}/{}", db.user, db.host, db.port, db.name);
    }
}

async fn run_settings_set(session: &ChatSession) -> Result<()> {
    let current = SettingsForm::from_settings(&session.settings());

    let entered = Password::new()
        .with_prompt("API key (leave blank to keep the current one)")
        .allow_empty_password(true)
        .interact()?;
    let api_key = if entered.trim().is_empty() {
        current.api_key.clone()
    } else {
        entered
    };

    let use_database = Confirm::new()
        .with_prompt("Store history in a database?")
        .default(current.use_database)
        .interact()?;

    let mut form = SettingsForm {
        api_key,
        use_database,
        ..current.clone()
    };
    if use_database {
        form.db_host = Input::new()
            .with_prompt("Database host")
            .default(current.db_host)
            .interact_text()?;
        form.db_port = Input::new()
            .with_prompt("Database port")
            .default(current.db_port)
            .interact_text()?;
        form.db_user = Input::new()
            .with_prompt("Database user")
            .default(current.db_user)
            .interact_text()?;
        form.db_password = Password::new()
            .with_prompt("Database password")
            .allow_empty_password(true)
            .interact()?;
        form.db_name = Input::new()
            .with_prompt("Database name")
            .default(current.db_name)
            .interact_text()?;
    }

    if let SyncOutcome::LocalOnly(reason) = session.save_settings(form).await? {
        debug!("Settings not synchronized: {}", reason);
    }
    Ok(())
}

async fn run_status(loader: &ConfigLoader, config: &Config, session: &ChatSession) {
    println!("{}", style("autoagent status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Backend: {}", config.client.base_url);
    let mode = match config.client.sync_mode {
        SyncMode::Settings => "settings",
        SyncMode::Initialize => "initialize",
    };
    println!("  Sync mode: {}", mode);
    println!("  Storage: {}", expand_tilde(&config.storage.dir).display());
    println!();

    println!("{}", style("Session:").bold());
    let settings = session.settings();
    let key = if settings.has_api_key() {
        style("configured").green()
    } else {
        style("not configured").red()
    };
    println!("  API key: {}", key);
    println!("  Conversations: {}", session.conversations().len());
    println!("  Current: {}", session.current().title);
    println!();

    println!("{}", style("Backend:").bold());
    match session.health().await {
        Ok(health) => {
            let state = if health.healthy {
                style("healthy").green()
            } else {
                style("unhealthy").red()
            };
            println!("  Status: {}", state);
            match health.agent_initialized {
                Some(true) => println!("  Agent: {}", style("initialized").green()),
                Some(false) => println!("  Agent: {}", style("not initialized").yellow()),
                None => {}
            }
        }
        Err(e) => println!("  Status: {} ({})", style("unreachable").red(), e),
    }
}

fn print_history(history: &History) {
    match history {
        History::Conversations { conversations } => {
            if conversations.is_empty() {
                println!("No conversations on the server.");
            }
            for conversation in conversations {
                println!(
                    "{} {}",
                    style(&conversation.conversation_id).cyan(),
                    style(conversation.last_activity.as_deref().unwrap_or("")).dim()
                );
            }
        }
        History::Messages { messages } => {
            for message in messages {
                println!(
                    "{} {}",
                    style(&message.role).bold(),
                    truncate_chars(&message.content, 200)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoagent_core::conversation::{Message, Role};
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_conversation() {
        let cli = Cli::try_parse_from([
            "autoagent",
            "chat",
            "--message",
            "hello",
            "-C",
            "chat_1",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat {
                message,
                conversation,
            } => {
                assert_eq!(message, "hello");
                assert_eq!(conversation.as_deref(), Some("chat_1"));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_config_dir_is_global() {
        let cli = Cli::try_parse_from(["autoagent", "list", "--config-dir", "/tmp/aa"]).unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/aa")));
    }

    #[test]
    fn test_describe_counts_messages() {
        let mut conversation = Conversation::new("chat_1");
        conversation.push(Message::new(Role::User, "hi"));
        assert!(describe(&conversation).starts_with("1 message(s), created "));
    }

    #[test]
    fn test_user_facing_errors_are_not_printed_again() {
        let busy = anyhow::Error::from(autoagent_core::Error::Busy("default".to_string()));
        assert!(already_reported(&busy));

        let backend = anyhow::Error::from(autoagent_core::Error::Backend("quota".to_string()));
        assert!(!already_reported(&backend));

        let wrapped = anyhow::Error::from(autoagent_core::Error::Validation("empty".to_string()))
            .context("Failed to load configuration");
        assert!(!already_reported(&wrapped));

        assert!(!already_reported(&anyhow::anyhow!("No conversation with id x")));
    }

    #[tokio::test]
    async fn test_conversations_persist_across_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path().join("config"));
        let mut config = Config::default();
        config.storage.dir = temp_dir.path().join("storage").display().to_string();
        loader.save(&config).unwrap();

        let config = loader.load().unwrap();
        let session = open_session(&config, Arc::new(TerminalView::new())).unwrap();
        let id = session.create_conversation().await.unwrap();
        session.rename(&id, "Notes").unwrap();
        drop(session);

        let reopened = open_session(&config, Arc::new(TerminalView::new())).unwrap();
        let conversations = reopened.conversations();
        assert_eq!(conversations.len(), 2);
        assert_eq!(reopened.current().id, id);
        assert_eq!(reopened.current().title, "Notes");
        assert!(temp_dir.path().join("storage").is_dir());
    }
}
