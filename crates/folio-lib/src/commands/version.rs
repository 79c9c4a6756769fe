//! Version CLI command: display application version.
//!
//! Honours the global `--json` flag for machine-readable output.

use clap::{ArgMatches, Command};
use serde::Serialize;

use crate::cli::{wants_json, CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::Result;
use crate::output;

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

const VERSION_INFO: VersionInfo = VersionInfo {
    name: "folio",
    version: env!("CARGO_PKG_VERSION"),
};

pub fn version_command() -> Command {
    Command::new("version").about("Show version information")
}

pub fn version_meta() -> CommandMeta {
    CommandBuilder::from_clap(version_command())
        .category(CommandCategory::Core)
        .build()
}

/// Handle the `version` command.
pub fn handle_version(matches: &ArgMatches) -> Result<()> {
    if wants_json(matches) {
        output::json(&VERSION_INFO)
    } else {
        println!("{} version {}", VERSION_INFO.name, VERSION_INFO.version);
        Ok(())
    }
}
