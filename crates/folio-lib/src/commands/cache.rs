//! Cache CLI command: manage the offline copy of the site's core assets.
//!
//! Subcommands: install, activate, fetch, list, clear.

use clap::{Arg, ArgMatches, Command};

use crate::cache::AssetCache;
use crate::cli::{wants_json, CommandBuilder, CommandCategory, CommandMeta};
use crate::commands::registry_cmd::ServiceRegistry;
use crate::errors::{FolioError, Result};
use crate::output;
use crate::output::progress::create_spinner;

pub fn cache_command() -> Command {
    Command::new("cache")
        .about("Manage the offline asset cache")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Fetch and store every core asset"))
        .subcommand(Command::new("activate").about("Drop cache generations other than the current one"))
        .subcommand(
            Command::new("fetch")
                .about("Fetch a url network-first, falling back to the cache")
                .arg(Arg::new("url").required(true)),
        )
        .subcommand(Command::new("list").about("List cached entries"))
        .subcommand(Command::new("clear").about("Remove every cached entry"))
}

pub fn cache_meta() -> CommandMeta {
    CommandBuilder::from_clap(cache_command())
        .category(CommandCategory::System)
        .build()
}

/// Handle the `cache` command.
pub async fn handle_cache(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    let cache = services.asset_cache().await?;
    match matches.subcommand() {
        Some(("install", sub)) => {
            let urls = services.config_manager.get_config().await.core_asset_urls();
            let spinner = create_spinner("Caching core assets...", wants_json(sub));
            let installed = cache.install(&urls).await;
            spinner.finish_and_clear();
            let installed = installed?;
            report(sub, cache, "installed", installed, &format!("Cached {installed} assets"))
        }
        Some(("activate", sub)) => {
            let removed = cache.activate().await?;
            if wants_json(sub) {
                return output::json(&serde_json::json!({
                    "version": cache.version(),
                    "removed": removed,
                }));
            }
            if removed.is_empty() {
                output::info(&format!("{} is the only generation", cache.version()));
            } else {
                output::success(&format!("Removed {}", removed.join(", ")));
            }
            Ok(())
        }
        Some(("fetch", sub)) => {
            let url = sub
                .get_one::<String>("url")
                .ok_or_else(|| FolioError::Command("Missing argument: url".into()))?;
            let resp = cache.fetch(url).await?;
            let source = if resp.from_cache { "cache" } else { "network" };
            if wants_json(sub) {
                return output::json(&serde_json::json!({
                    "url": resp.url,
                    "status": resp.status,
                    "contentType": resp.content_type,
                    "bytes": resp.body.len(),
                    "source": source,
                }));
            }
            println!(
                "{} {} ({} bytes from {})",
                resp.status,
                resp.url,
                resp.body.len(),
                source
            );
            Ok(())
        }
        Some(("list", sub)) => {
            let entries = cache.entries().await?;
            if wants_json(sub) {
                return output::json(&entries);
            }
            if entries.is_empty() {
                output::warning("Cache is empty");
            }
            for entry in entries {
                println!(
                    "  {:<20} {} {:>8}  {}",
                    entry.generation, entry.status, entry.size, entry.url
                );
            }
            Ok(())
        }
        Some(("clear", sub)) => {
            let removed = cache.clear().await?;
            report(sub, cache, "removed", removed, &format!("Removed {removed} entries"))
        }
        _ => Err(FolioError::Command("Unknown cache subcommand".into())),
    }
}

fn report(sub: &ArgMatches, cache: &AssetCache, key: &str, count: usize, message: &str) -> Result<()> {
    if wants_json(sub) {
        let mut body = serde_json::Map::new();
        body.insert("version".into(), cache.version().into());
        body.insert(key.into(), count.into());
        return output::json(&body);
    }
    output::success(message);
    Ok(())
}
