// src/config.rs
use crate::core::time::parse_offset;
use crate::core::ApiVersion;
use crate::error::AppError;
use crate::types::{ApiKey, NotionId};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command-line input, before validation.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: Command,

    /// Notion API version to pin requests to
    #[arg(long, default_value = "2022-06-28")]
    pub api_version: String,

    /// Zone for naive date-times, as +HH:MM (defaults to +09:00)
    #[arg(long)]
    pub time_zone: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Retrieve a page and print its properties
    Page { id: String },

    /// Retrieve a database and print its schema
    Database { id: String },

    /// Retrieve a single block
    Block { id: String },

    /// List the children of a block or page
    Children {
        id: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the pages of a database
    Query {
        database: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search page and database titles
    Search {
        query: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Save pages as raw JSON into a directory
    Backup {
        dir: PathBuf,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print a page from a backup directory
    Restore { dir: PathBuf, id: String },
}

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Page(NotionId),
    Database(NotionId),
    Block(NotionId),
    Children { id: NotionId, limit: Option<usize> },
    Query { database: NotionId, limit: Option<usize> },
    Search { query: Option<String>, limit: Option<usize> },
    Backup { dir: PathBuf, ids: Vec<NotionId> },
    Restore { dir: PathBuf, id: NotionId },
}

impl TryFrom<Command> for Action {
    type Error = AppError;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        Ok(match command {
            Command::Page { id } => Action::Page(NotionId::parse(&id)?),
            Command::Database { id } => Action::Database(NotionId::parse(&id)?),
            Command::Block { id } => Action::Block(NotionId::parse(&id)?),
            Command::Children { id, limit } => Action::Children {
                id: NotionId::parse(&id)?,
                limit,
            },
            Command::Query { database, limit } => Action::Query {
                database: NotionId::parse(&database)?,
                limit,
            },
            Command::Search { query, limit } => Action::Search { query, limit },
            Command::Backup { dir, ids } => Action::Backup {
                dir,
                ids: ids
                    .iter()
                    .map(|id| NotionId::parse(id))
                    .collect::<Result<_, _>>()?,
            },
            Command::Restore { dir, id } => Action::Restore {
                dir,
                id: NotionId::parse(&id)?,
            },
        })
    }
}

/// Resolved settings, validated and ready to build a client from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiKey,
    pub api_version: ApiVersion,
    pub time_zone: Option<FixedOffset>,
    pub verbose: bool,
    pub action: Action,
}

impl Settings {
    /// Resolves settings from CLI input and the `NOTION_API_KEY` environment variable.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let api_key = std::env::var("NOTION_API_KEY").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_API_KEY environment variable not set".to_string(),
            )
        })?;
        Self::resolve_with_key(cli, api_key)
    }

    pub fn resolve_with_key(cli: CommandLineInput, api_key: String) -> Result<Self, AppError> {
        Ok(Settings {
            api_key: ApiKey::new(api_key)?,
            api_version: cli.api_version.parse()?,
            time_zone: cli.time_zone.as_deref().map(parse_offset).transpose()?,
            verbose: cli.verbose,
            action: Action::try_from(cli.command)?,
        })
    }
}
