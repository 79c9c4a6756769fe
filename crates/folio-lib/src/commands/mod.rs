pub mod cache;
pub mod config_cmd;
pub mod dropbox;
pub mod gallery;
pub mod registry_cmd;
pub mod version;

use clap::ArgMatches;

use crate::cli::CommandRegistry;
use crate::commands::registry_cmd::ServiceRegistry;
use crate::errors::{FolioError, Result};

/// Register every `folio` subcommand.
pub fn register_commands(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(version::version_meta())?;
    registry.register(config_cmd::config_meta())?;
    registry.register(registry_cmd::registry_meta())?;
    registry.register(gallery::gallery_meta())?;
    registry.register(dropbox::dropbox_meta())?;
    registry.register(cache::cache_meta())?;
    Ok(())
}

/// Dispatch a parsed command to its handler with the services it needs.
pub async fn dispatch_command(
    name: &str,
    matches: &ArgMatches,
    services: &ServiceRegistry,
) -> Result<()> {
    match name {
        "version" => version::handle_version(matches),
        "config" => config_cmd::handle_config(matches, &services.config_manager).await,
        "registry" => registry_cmd::handle_registry(matches),
        "gallery" => gallery::handle_gallery(matches, services).await,
        "dropbox" => dropbox::handle_dropbox(matches, services).await,
        "cache" => cache::handle_cache(matches, services).await,
        _ => Err(FolioError::Command(format!("Unknown command: {}", name))),
    }
}
