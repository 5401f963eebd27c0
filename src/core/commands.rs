//! Command table and processor
//!
//! Inbound text is matched against a fixed table of commands, each declaring
//! its argument arity and a parser producing a typed `Command`. Validation
//! happens once, before anything touches the registry. The processor then
//! applies the command: registry mutation, persistence, scheduler signal,
//! reply.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::adapters::{InboundCommand, Notifier};
use crate::core::format::format_listing;
use crate::core::registry::{RegistryError, SharedRegistry};
use crate::core::scheduler::SchedulerControl;
use crate::core::store::{ConfigStore, PersistedState};

/// Largest accepted `timer` value (one week)
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Help,
    Name { index: usize, name: String },
    Add { symbol: String },
    Remove { index: usize },
    Enable { index: usize },
    Disable { index: usize },
    Timer { minutes: u64 },
}

/// Command failures; `Display` is the reply sent back to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}. Send /help for the command list.")]
    Unknown(String),

    #[error("{reason}. Usage: {usage}")]
    Usage { reason: String, usage: &'static str },

    #[error("Index {0} not found")]
    NotFound(usize),

    #[error("Market {0} already exists")]
    AlreadyExists(String),
}

impl From<RegistryError> for CommandError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(symbol) => CommandError::AlreadyExists(symbol),
            RegistryError::IndexNotFound(index) => CommandError::NotFound(index),
        }
    }
}

type ParseFn = fn(&[&str], &'static str) -> Result<Command, CommandError>;

/// One row of the command table
struct CommandDef {
    name: &'static str,
    usage: &'static str,
    min_args: usize,
    /// `None` means the last argument swallows the rest of the line
    max_args: Option<usize>,
    parse: ParseFn,
}

const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "list",
        usage: "/list",
        min_args: 0,
        max_args: Some(0),
        parse: parse_list,
    },
    CommandDef {
        name: "name",
        usage: "/name <index> <name>",
        min_args: 2,
        max_args: None,
        parse: parse_name,
    },
    CommandDef {
        name: "add",
        usage: "/add <symbol>",
        min_args: 1,
        max_args: Some(1),
        parse: parse_add,
    },
    CommandDef {
        name: "remove",
        usage: "/remove <index>",
        min_args: 1,
        max_args: Some(1),
        parse: parse_remove,
    },
    CommandDef {
        name: "enable",
        usage: "/enable <index>",
        min_args: 1,
        max_args: Some(1),
        parse: parse_enable,
    },
    CommandDef {
        name: "disable",
        usage: "/disable <index>",
        min_args: 1,
        max_args: Some(1),
        parse: parse_disable,
    },
    CommandDef {
        name: "timer",
        usage: "/timer <minutes>",
        min_args: 1,
        max_args: Some(1),
        parse: parse_timer,
    },
    CommandDef {
        name: "help",
        usage: "/help",
        min_args: 0,
        max_args: Some(0),
        parse: parse_help,
    },
];

fn usage_error(reason: impl Into<String>, usage: &'static str) -> CommandError {
    CommandError::Usage {
        reason: reason.into(),
        usage,
    }
}

fn parse_index(raw: &str, usage: &'static str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(usage_error("Index must be a positive integer", usage)),
    }
}

fn parse_list(_: &[&str], _: &'static str) -> Result<Command, CommandError> {
    Ok(Command::List)
}

fn parse_help(_: &[&str], _: &'static str) -> Result<Command, CommandError> {
    Ok(Command::Help)
}

fn parse_name(args: &[&str], usage: &'static str) -> Result<Command, CommandError> {
    let index = parse_index(args[0], usage)?;
    Ok(Command::Name {
        index,
        name: args[1..].join(" "),
    })
}

fn parse_add(args: &[&str], _: &'static str) -> Result<Command, CommandError> {
    Ok(Command::Add {
        symbol: args[0].to_uppercase(),
    })
}

fn parse_remove(args: &[&str], usage: &'static str) -> Result<Command, CommandError> {
    Ok(Command::Remove {
        index: parse_index(args[0], usage)?,
    })
}

fn parse_enable(args: &[&str], usage: &'static str) -> Result<Command, CommandError> {
    Ok(Command::Enable {
        index: parse_index(args[0], usage)?,
    })
}

fn parse_disable(args: &[&str], usage: &'static str) -> Result<Command, CommandError> {
    Ok(Command::Disable {
        index: parse_index(args[0], usage)?,
    })
}

fn parse_timer(args: &[&str], usage: &'static str) -> Result<Command, CommandError> {
    match args[0].parse::<u64>() {
        Ok(0) | Err(_) => Err(usage_error("Interval must be a positive integer", usage)),
        Ok(minutes) if minutes > MAX_INTERVAL_MINUTES => Err(usage_error(
            format!("Interval must be at most {} minutes", MAX_INTERVAL_MINUTES),
            usage,
        )),
        Ok(minutes) => Ok(Command::Timer { minutes }),
    }
}

/// Parse one command line (`/add GC=F`, `enable 2`, `/list@my_bot`)
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let word = head.trim_start_matches('/');
    let word = word.split('@').next().unwrap_or(word).to_lowercase();

    let def = COMMANDS
        .iter()
        .find(|def| def.name == word)
        .ok_or_else(|| CommandError::Unknown(head.to_string()))?;

    let arity_ok = args.len() >= def.min_args
        && def.max_args.map_or(true, |max| args.len() <= max);
    if !arity_ok {
        return Err(usage_error("Wrong number of arguments", def.usage));
    }

    (def.parse)(&args, def.usage)
}

/// Reply for `/help`
pub fn help_text() -> String {
    let mut lines = vec!["Commands:".to_string()];
    lines.extend(COMMANDS.iter().map(|def| def.usage.to_string()));
    lines.join("\n")
}

/// Applies commands to the registry and replies through the notifier
pub struct CommandProcessor<N>
where
    N: Notifier,
{
    registry: SharedRegistry,
    store: ConfigStore,
    control: Arc<SchedulerControl>,
    notifier: Arc<N>,
}

impl<N> CommandProcessor<N>
where
    N: Notifier,
{
    pub fn new(
        registry: SharedRegistry,
        store: ConfigStore,
        control: Arc<SchedulerControl>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            registry,
            store,
            control,
            notifier,
        }
    }

    /// Parse, execute and reply to one inbound line
    pub async fn handle(&self, inbound: InboundCommand) {
        let reply = match parse_command(&inbound.text) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(e),
        };

        let text = match reply {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id = %inbound.chat_id, command = %inbound.text, error = %e, "Command rejected");
                e.to_string()
            }
        };

        if let Err(e) = self.notifier.reply(&inbound.chat_id, &text).await {
            error!(chat_id = %inbound.chat_id, error = %e, "Failed to send command reply");
        }
    }

    /// Apply a validated command, returning the confirmation text
    pub async fn execute(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::List => {
                let rows = self.registry.lock().await.list();
                Ok(format_listing(&rows))
            }
            Command::Help => Ok(help_text()),
            Command::Name { index, name } => {
                let (symbol, state) = {
                    let mut registry = self.registry.lock().await;
                    let symbol = registry.rename_by_index(index, &name)?;
                    (symbol, registry.to_persisted())
                };
                self.persist(state).await;
                info!(symbol = %symbol, name = %name, "Market renamed");
                Ok(format!("Renamed market {} to {}", symbol, name))
            }
            Command::Add { symbol } => {
                let state = {
                    let mut registry = self.registry.lock().await;
                    registry.add(&symbol)?;
                    registry.to_persisted()
                };
                self.persist(state).await;
                self.control.wake_if_idle();
                info!(symbol = %symbol, "Market added");
                Ok(format!("Added market: {}", symbol))
            }
            Command::Remove { index } => {
                let (symbol, state) = {
                    let mut registry = self.registry.lock().await;
                    let symbol = registry.remove_by_index(index)?;
                    (symbol, registry.to_persisted())
                };
                self.persist(state).await;
                info!(symbol = %symbol, "Market removed");
                Ok(format!("Removed market: {}", symbol))
            }
            Command::Enable { index } => self.set_enabled(index, true).await,
            Command::Disable { index } => self.set_enabled(index, false).await,
            Command::Timer { minutes } => {
                self.control.set_interval(Duration::from_secs(minutes * 60));
                self.control.restart();
                info!(minutes = minutes, "Rotation interval changed");
                Ok(format!("Set timer to {} minutes", minutes))
            }
        }
    }

    async fn set_enabled(&self, index: usize, enabled: bool) -> Result<String, CommandError> {
        let (symbol, state) = {
            let mut registry = self.registry.lock().await;
            let symbol = registry.set_enabled_by_index(index, enabled)?;
            (symbol, registry.to_persisted())
        };
        self.persist(state).await;
        self.control.restart();

        let verb = if enabled { "Enabled" } else { "Disabled" };
        info!(symbol = %symbol, enabled = enabled, "Market toggled");
        Ok(format!("{} market: {}", verb, symbol))
    }

    /// Write the registry on the blocking pool; failures leave memory
    /// authoritative until the next save
    async fn persist(&self, state: PersistedState) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(&state)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(path = %self.store.path().display(), error = %e, "Failed to persist registry")
            }
            Err(e) => error!(error = %e, "Persist task failed"),
        }
    }
}
