use std::path::Path;

use tracing::info;

use crate::buffer::VecBuffer;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::load_config;
use crate::io::wiki_file::{load_wiki, save_wiki};
use crate::parse::parse_wiki_line;
use crate::store::{TaskStore, open_store};
use crate::sync::{SyncCache, SyncSummary};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Sync(args) => cmd_write(args, config, json, WriteMode::Sync),
        Commands::Save(args) => cmd_write(args, config, json, WriteMode::Save),
        Commands::Refresh(args) => cmd_write(args, config, json, WriteMode::Refresh),
        Commands::Show(args) => cmd_show(args, json),
        Commands::Order(args) => cmd_order(args, config, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Sync,
    Save,
    Refresh,
}

impl WriteMode {
    fn verb(self) -> &'static str {
        match self {
            WriteMode::Sync => "synced",
            WriteMode::Save => "saved",
            WriteMode::Refresh => "refreshed",
        }
    }
}

type WikiCache = SyncCache<Box<dyn TaskStore>, VecBuffer>;

/// Load config, store and wiki for one file
fn open_cache(file: &Path, config: Option<&Path>) -> Result<WikiCache, Box<dyn std::error::Error>> {
    let loaded = load_config(config, file)?;
    let store = open_store(&loaded.config.store, &loaded.base_dir)?;
    let buffer = load_wiki(file)?;
    Ok(SyncCache::new(store, buffer).with_short_uuids(loaded.config.short_uuids))
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_write(
    args: WriteArgs,
    config: Option<&Path>,
    json: bool,
    mode: WriteMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = open_cache(&args.file, config)?;

    let summary: SyncSummary = match mode {
        WriteMode::Sync => cache.sync_buffer()?,
        WriteMode::Save => cache.save_buffer()?,
        WriteMode::Refresh => cache.refresh_buffer()?,
    };
    let (_, buffer) = cache.into_parts();

    if args.dry_run {
        let text = buffer.to_text();
        if json {
            let out = WriteResultJson {
                summary,
                text: Some(text),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            print!("{}", text);
        }
        return Ok(());
    }

    save_wiki(&args.file, &buffer)?;
    info!(file = %args.file.display(), "wiki written");

    if json {
        let out = WriteResultJson {
            summary,
            text: None,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", format_summary(mode.verb(), &summary));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(args: ReadArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = load_wiki(&args.file)?;
    let lines: Vec<_> = buffer
        .lines()
        .iter()
        .enumerate()
        .filter_map(|(i, text)| parse_wiki_line(text).map(|line| (i, line)))
        .collect();

    if json {
        let out: Vec<LineJson> = lines
            .iter()
            .map(|(i, line)| wiki_line_to_json(*i, line))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (i, line) in &lines {
            println!("{}", format_wiki_line(*i, line));
        }
    }
    Ok(())
}

fn cmd_order(
    args: ReadArgs,
    config: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = open_cache(&args.file, config)?;
    cache.load_buffer()?;
    let order = cache.save_order()?;

    let mut entries = Vec::with_capacity(order.len());
    for line in order {
        if let Some(projection) = cache.get_by_line(line)? {
            entries.push(OrderEntryJson {
                line: line + 1,
                text: projection.line.text.clone(),
                uuid: projection.line.uuid.as_ref().map(|u| u.to_string()),
            });
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            match entry.uuid {
                Some(ref uuid) => println!("{:>4}  {}  #{}", entry.line, entry.text, uuid),
                None => println!("{:>4}  {}  (new)", entry.line, entry.text),
            }
        }
    }
    Ok(())
}
