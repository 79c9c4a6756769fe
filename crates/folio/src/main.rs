use std::sync::Arc;

use folio_lib::cli::{create_root_command, is_verbose, CommandRegistry};
use folio_lib::commands::register_commands;
use folio_lib::commands::registry_cmd::ServiceRegistry;
use folio_lib::config::manager::DynamicConfigManager;
use folio_lib::errors::{handle_command_error, handle_fatal, FolioError};
use folio_lib::http_client::HttpClient;

#[tokio::main]
async fn main() {
    // Build the command tree
    let mut registry = CommandRegistry::new(create_root_command());
    if let Err(e) = register_commands(&mut registry) {
        handle_fatal(e);
    }
    let mut root = registry.build_root();
    let matches = root.get_matches_mut();

    // Logging follows --verbose, unless --json asked for clean output
    let verbose = is_verbose(&matches);
    folio_lib::logger::set_verbose(verbose);
    folio_lib::logger::init(verbose);

    let config_manager = match DynamicConfigManager::initialize(None).await {
        Ok(manager) => Arc::new(manager),
        Err(e) => handle_fatal(e),
    };
    let config = config_manager.get_config().await;
    let http_client = match HttpClient::new(&config) {
        Ok(client) => client,
        Err(e) => handle_fatal(e),
    };
    let services = ServiceRegistry::new(config_manager, http_client);
    services.register_config_listeners().await;

    match matches.subcommand() {
        Some((name, sub_matches)) => {
            tracing::debug!(command = name, "Executing command");
            if let Err(e) = folio_lib::commands::dispatch_command(name, sub_matches, &services).await {
                handle_command_error(&e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = root.print_help() {
                handle_fatal(FolioError::Io(e));
            }
        }
    }
}
