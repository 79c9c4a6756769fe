//! Dropbox CLI command: check the app credentials.

use clap::{ArgMatches, Command};

use crate::cli::{wants_json, CommandBuilder, CommandCategory, CommandMeta};
use crate::cloud::CloudClient;
use crate::commands::registry_cmd::ServiceRegistry;
use crate::errors::{FolioError, Result};
use crate::output;
use crate::output::progress::create_spinner;

pub fn dropbox_command() -> Command {
    Command::new("dropbox")
        .about("Dropbox account utilities")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("token").about("Exchange the refresh token for an access token and report the result"),
        )
}

pub fn dropbox_meta() -> CommandMeta {
    CommandBuilder::from_clap(dropbox_command())
        .category(CommandCategory::Cloud)
        .build()
}

/// Handle the `dropbox` command.
pub async fn handle_dropbox(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    match matches.subcommand() {
        Some(("token", sub)) => {
            let json = wants_json(sub);
            let client = services.dropbox().await?;
            let spinner = create_spinner("Requesting access token...", json);
            let result = client.authenticate().await;
            spinner.finish_and_clear();
            result?;
            if json {
                output::json(&serde_json::json!({ "provider": client.name(), "authenticated": true }))?;
            } else {
                output::success(&format!("Authenticated with {}", client.name()));
            }
            Ok(())
        }
        _ => Err(FolioError::Command("Unknown dropbox subcommand".into())),
    }
}
