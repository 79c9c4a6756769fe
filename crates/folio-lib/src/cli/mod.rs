pub mod registry;

pub use registry::{CommandBuilder, CommandCategory, CommandMeta, CommandRegistry, RegistryStats};

/// Whether `--json` was passed anywhere on the command line.
pub fn wants_json(matches: &clap::ArgMatches) -> bool {
    matches
        .try_get_one::<bool>("json")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

/// Root `folio` command with the global `--verbose` and `--json` flags.
pub fn create_root_command() -> clap::Command {
    clap::Command::new("folio")
        .about("Password-gated Dropbox media gallery with an offline asset cache")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Output in JSON format"),
        )
}

/// `--verbose` without `--json`; JSON output stays free of log noise.
pub fn is_verbose(matches: &clap::ArgMatches) -> bool {
    let verbose = matches.get_flag("verbose");
    let json = matches.get_flag("json");
    verbose && !json
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_command_has_verbose_flag() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["folio", "--verbose"]).unwrap();
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_root_command_has_json_flag() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["folio", "--json"]).unwrap();
        assert!(matches.get_flag("json"));
    }

    #[test]
    fn test_verbose_suppressed_with_json() {
        let cmd = create_root_command();
        let matches = cmd
            .try_get_matches_from(["folio", "--verbose", "--json"])
            .unwrap();
        assert!(!is_verbose(&matches));
    }

    #[test]
    fn test_verbose_active_without_json() {
        let cmd = create_root_command();
        let matches = cmd
            .try_get_matches_from(["folio", "--verbose"])
            .unwrap();
        assert!(is_verbose(&matches));
    }

    #[test]
    fn test_json_flag_is_global() {
        let cmd = create_root_command().subcommand(clap::Command::new("cache"));
        let matches = cmd.try_get_matches_from(["folio", "cache", "--json"]).unwrap();
        assert!(matches.get_flag("json"));
    }

    #[test]
    fn test_short_verbose_flag() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["folio", "-v"]).unwrap();
        assert!(is_verbose(&matches));
    }

    #[test]
    fn test_no_flags_not_verbose() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["folio"]).unwrap();
        assert!(!is_verbose(&matches));
    }
}
