//! Registry CLI command: list registered commands (text and JSON).
//!
//! Named `registry_cmd` to avoid conflict with the `cli::registry` module.
//!
//! Also contains `ServiceRegistry`, the holder for lazily-initialized
//! services shared across command handlers.

use std::sync::Arc;

use clap::{Arg, ArgMatches, Command};
use tokio::sync::OnceCell;

use crate::cache::AssetCache;
use crate::cli::{create_root_command, wants_json, CommandBuilder, CommandCategory, CommandMeta, CommandRegistry};
use crate::cloud::dropbox::DropboxClient;
use crate::config::manager::DynamicConfigManager;
use crate::config::simplified::SimplifiedConfig;
use crate::errors::Result;
use crate::gallery::{Gallery, GallerySettings};
use crate::http_client::HttpClient;
use crate::output;

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Services built once per process and handed to every command handler.
///
/// The Dropbox client and asset cache are created on first use, so
/// commands such as `version` and `config` run without credentials.
pub struct ServiceRegistry {
    pub config_manager: Arc<DynamicConfigManager>,
    pub http_client: HttpClient,
    dropbox: OnceCell<Arc<DropboxClient>>,
    asset_cache: OnceCell<Arc<AssetCache>>,
}

impl ServiceRegistry {
    pub fn new(config_manager: Arc<DynamicConfigManager>, http_client: HttpClient) -> Self {
        Self {
            config_manager,
            http_client,
            dropbox: OnceCell::new(),
            asset_cache: OnceCell::new(),
        }
    }

    /// Rebuild the shared `HttpClient` whenever timeout or pool settings change.
    pub async fn register_config_listeners(&self) {
        let http = self.http_client.clone();
        self.config_manager
            .register_on_change(move |cfg| {
                let http = http.clone();
                let cfg = cfg.clone();
                tokio::spawn(async move {
                    if let Err(e) = http.update_from_config(&cfg).await {
                        tracing::warn!("Failed to update HttpClient from config: {e}");
                    }
                });
            })
            .await;
    }

    /// The Dropbox client, built from the environment credentials on first use.
    pub async fn dropbox(&self) -> Result<&Arc<DropboxClient>> {
        self.dropbox
            .get_or_try_init(|| async {
                let credentials = SimplifiedConfig::get().dropbox_credentials()?;
                let config = self.config_manager.get_config().await;
                Ok(Arc::new(DropboxClient::from_config(
                    self.http_client.clone(),
                    credentials,
                    &config,
                )))
            })
            .await
    }

    /// The asset cache at `~/.folio/asset-cache.db`, opened on first use.
    pub async fn asset_cache(&self) -> Result<&Arc<AssetCache>> {
        self.asset_cache
            .get_or_try_init(|| async {
                let config = self.config_manager.get_config().await;
                let cache = AssetCache::new(
                    SimplifiedConfig::get().cache_db_file.clone(),
                    self.http_client.clone(),
                    config.cache_version,
                )?;
                Ok(Arc::new(cache))
            })
            .await
    }

    /// A fresh, locked gallery over the shared Dropbox client.
    pub async fn gallery(&self) -> Result<Gallery> {
        let dropbox = Arc::clone(self.dropbox().await?);
        let config = self.config_manager.get_config().await;
        Ok(Gallery::new(
            dropbox,
            self.http_client.clone(),
            GallerySettings::from_config(&config),
        ))
    }
}

// ---------------------------------------------------------------------------
// registry command
// ---------------------------------------------------------------------------

pub fn registry_command() -> Command {
    Command::new("registry")
        .about("List the registered commands by category")
        .arg(
            Arg::new("stats")
                .long("stats")
                .action(clap::ArgAction::SetTrue)
                .help("Show counts per category instead of the listing"),
        )
}

pub fn registry_meta() -> CommandMeta {
    CommandBuilder::from_clap(registry_command())
        .category(CommandCategory::System)
        .aliases(&["commands"])
        .build()
}

/// Handle the `registry` command.
pub fn handle_registry(matches: &ArgMatches) -> Result<()> {
    let mut registry = CommandRegistry::new(create_root_command());
    crate::commands::register_commands(&mut registry)?;
    let json = wants_json(matches);

    if matches.get_flag("stats") {
        let stats = registry.stats();
        if json {
            return output::json(&stats);
        }
        println!("Total commands: {}", stats.total);
        println!("Hidden: {}", stats.hidden);
        for (cat, count) in &stats.per_category {
            println!("  {:<8} {}", cat, count);
        }
        return Ok(());
    }

    if json {
        registry.list_commands_json()
    } else {
        registry.list_commands();
        Ok(())
    }
}
