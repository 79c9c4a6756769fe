//! Config CLI command: view and modify `~/.folio/config.json`.
//!
//! Named `config_cmd` to avoid conflict with the `config` module.

use clap::{Arg, ArgMatches, Command};
use serde_json::Value;

use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::config::manager::DynamicConfigManager;
use crate::errors::{FolioError, Result};
use crate::output;

pub fn config_command() -> Command {
    Command::new("config")
        .about("View and modify configuration")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("show").about("Print the full configuration"))
        .subcommand(
            Command::new("get")
                .about("Print one configuration value")
                .arg(Arg::new("key").required(true).help("Key as written in config.json")),
        )
        .subcommand(
            Command::new("set")
                .about("Change one configuration value")
                .arg(Arg::new("key").required(true))
                .arg(
                    Arg::new("value")
                        .required(true)
                        .help("JSON value; anything that is not valid JSON is stored as a string"),
                ),
        )
        .subcommand(Command::new("reset").about("Restore every default"))
        .subcommand(Command::new("path").about("Print the configuration file path"))
}

pub fn config_meta() -> CommandMeta {
    CommandBuilder::from_clap(config_command())
        .category(CommandCategory::Core)
        .aliases(&["conf"])
        .build()
}

/// Interpret a command-line value against the key's current value.
///
/// String keys take the raw text as-is, so a passcode of `0042` stays a
/// string. Other keys parse as JSON (`30`, `true`, `["/"]`).
fn parse_value(raw: &str, current: &Value) -> Value {
    if current.is_string() {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Handle the `config` command.
pub async fn handle_config(matches: &ArgMatches, config_mgr: &DynamicConfigManager) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => {
            let config = config_mgr.get_config().await;
            output::json(&config)?;
        }
        Some(("get", sub)) => {
            let key = required(sub, "key")?;
            let config = serde_json::to_value(config_mgr.get_config().await)?;
            let value = config
                .get(key)
                .ok_or_else(|| FolioError::Config(format!("Unknown config key: {key}")))?;
            match value {
                Value::String(s) => println!("{s}"),
                other => println!("{other}"),
            }
        }
        Some(("set", sub)) => {
            let key = required(sub, "key")?;
            let config = serde_json::to_value(config_mgr.get_config().await)?;
            let current = config.get(key).unwrap_or(&Value::Null);
            let value = parse_value(required(sub, "value")?, current);
            let mut updates = serde_json::Map::new();
            updates.insert(key.to_string(), value);
            config_mgr.update_config(updates).await?;
            output::success(&format!("Updated {key}"));
        }
        Some(("reset", _)) => {
            config_mgr.reset_to_defaults().await?;
            output::success("Configuration reset to defaults");
        }
        Some(("path", _)) => {
            println!("{}", config_mgr.config_path().display());
        }
        _ => return Err(FolioError::Command("Unknown config subcommand".into())),
    }
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| FolioError::Command(format!("Missing argument: {id}")))
}
