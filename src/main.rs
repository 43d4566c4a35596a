// src/main.rs
use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_df::api::{
    QueryDatabase, RetrieveBlock, RetrieveBlockChildren, RetrieveDatabase, RetrievePage, Search,
};
use notion_df::backup::BackupDir;
use notion_df::config::{Action, CommandLineInput, Settings};
use notion_df::core::time::set_default_time_zone;
use notion_df::core::{NotionClient, PaginatedRequestBuilder, RequestBuilder, Snapshot};
use notion_df::model::{AnyObject, BlockKind, PageKind};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion_df.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn print_page(snapshot: &Snapshot<PageKind>) {
    let attrs = snapshot.attrs();
    println!(
        "{}  {}",
        snapshot.id(),
        attrs.title().unwrap_or_else(|| "Untitled".to_string())
    );
    for (name, property) in attrs.properties.iter().flatten() {
        match property.known() {
            Some(value) => println!("  {}: {}", name, value.display()),
            None => println!(
                "  {}: <{}>",
                name,
                property.kind().unwrap_or_else(|| "unknown".to_string())
            ),
        }
    }
}

fn print_block(snapshot: &Snapshot<BlockKind>) {
    let attrs = snapshot.attrs();
    println!(
        "{}  [{}] {}",
        snapshot.id(),
        attrs.block_type.as_deref().unwrap_or("?"),
        attrs.text().unwrap_or_default()
    );
}

fn print_object(object: &AnyObject) {
    println!(
        "{}  {:<8} {}",
        object.id(),
        object.object(),
        object.title().unwrap_or_default()
    );
}

/// Drains a paginated endpoint, printing each element as it arrives.
fn list<B, F>(client: &NotionClient, builder: B, limit: Option<usize>, print: F) -> anyhow::Result<()>
where
    B: PaginatedRequestBuilder,
    F: Fn(&B::Element),
{
    let description = format!("{} {}", builder.method(), builder.path());
    let mut pages = client.paginate(builder, limit);
    for element in pages.by_ref() {
        print(&element.with_context(|| format!("listing {}", description))?);
    }
    log::info!("{}: {} items in {} calls", description, pages.buffered().len(), pages.calls());
    Ok(())
}

fn run(settings: Settings) -> anyhow::Result<()> {
    if let Some(zone) = settings.time_zone {
        set_default_time_zone(zone);
    }
    let client = NotionClient::new(settings.api_key.clone())?;
    let version = settings.api_version;

    match settings.action {
        Action::Page(id) => {
            let page = client.execute(&RetrievePage::new(id).pinned(version))?;
            print_page(&page);
        }
        Action::Database(id) => {
            let database = client.execute(&RetrieveDatabase::new(id).pinned(version))?;
            let attrs = database.attrs();
            println!("{}  {}", database.id(), attrs.title_text().unwrap_or_default());
            for (name, schema) in attrs.properties.iter().flatten() {
                let kind = schema.get("type").and_then(|t| t.as_str()).unwrap_or("?");
                println!("  {}: {}", name, kind);
            }
        }
        Action::Block(id) => {
            let block = client.execute(&RetrieveBlock::new(id).pinned(version))?;
            print_block(&block);
        }
        Action::Children { id, limit } => list(
            &client,
            RetrieveBlockChildren::new(id).pinned(version),
            limit,
            |block| print_block(block),
        )?,
        Action::Query { database, limit } => list(
            &client,
            QueryDatabase::new(database).pinned(version),
            limit,
            |page| print_page(page),
        )?,
        Action::Search { query, limit } => {
            let search = Search {
                query,
                ..Search::default()
            };
            list(&client, search.pinned(version), limit, print_object)?
        }
        Action::Backup { dir, ids } => {
            let backup = BackupDir::open(&dir)?;
            let entities = ids
                .iter()
                .map(|id| client.identity_map().entity::<PageKind>(*id))
                .collect::<Vec<_>>();
            for result in client.refresh_all(&entities) {
                let snapshot = result?;
                let path = backup.save(&*snapshot)?;
                println!("✓ {} saved to {}", snapshot.id(), path.display());
            }
        }
        Action::Restore { dir, id } => {
            let backup = BackupDir::open(&dir)?;
            let entity = backup
                .restore_preview::<PageKind>(client.identity_map(), id)
                .with_context(|| format!("restoring {} from {}", id, dir.display()))?;
            if let Some(preview) = entity.preview() {
                print_page(&preview);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).context("failed to initialize logging")?;

    let settings = Settings::resolve(cli)?;

    run(settings)
}
