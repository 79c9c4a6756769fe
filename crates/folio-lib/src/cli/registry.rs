use clap::Command;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{FolioError, Result};

/// Groups shown by `folio registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Core,
    Media,
    Cloud,
    System,
}

impl CommandCategory {
    /// All categories in display order.
    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Core,
            CommandCategory::Media,
            CommandCategory::Cloud,
            CommandCategory::System,
        ]
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandCategory::Core => write!(f, "core"),
            CommandCategory::Media => write!(f, "media"),
            CommandCategory::Cloud => write!(f, "cloud"),
            CommandCategory::System => write!(f, "system"),
        }
    }
}

/// A registered top-level command and its listing metadata.
#[derive(Debug, Clone)]
pub struct CommandMeta {
    pub name: String,
    pub category: CommandCategory,
    pub description: String,
    pub aliases: Vec<String>,
    pub hidden: bool,
    pub command: Command,
}

#[derive(Debug, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub hidden: usize,
    pub per_category: BTreeMap<CommandCategory, usize>,
}

#[derive(Debug, Serialize)]
struct CommandJsonEntry<'a> {
    name: &'a str,
    description: &'a str,
    aliases: &'a [String],
    hidden: bool,
}

/// Top-level commands keyed by name, attached to the root on `build_root`.
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandMeta>,
    root: Command,
}

impl CommandRegistry {
    pub fn new(root: Command) -> Self {
        Self {
            commands: BTreeMap::new(),
            root,
        }
    }

    /// Register a command; names and aliases must be unique across the registry.
    pub fn register(&mut self, meta: CommandMeta) -> Result<()> {
        let taken = |candidate: &str| {
            self.commands
                .values()
                .any(|m| m.name == candidate || m.aliases.iter().any(|a| a == candidate))
        };
        if taken(&meta.name) {
            return Err(FolioError::Command(format!(
                "duplicate command name: {}",
                meta.name
            )));
        }
        if let Some(alias) = meta.aliases.iter().find(|a| taken(a)) {
            return Err(FolioError::Command(format!(
                "duplicate command alias: {}",
                alias
            )));
        }
        self.commands.insert(meta.name.clone(), meta);
        Ok(())
    }

    /// Look a command up by name or alias.
    pub fn find(&self, name: &str) -> Option<&CommandMeta> {
        self.commands.get(name).or_else(|| {
            self.commands
                .values()
                .find(|m| m.aliases.iter().any(|a| a == name))
        })
    }

    /// Commands in `cat`, sorted by name.
    pub fn get_by_category(&self, cat: CommandCategory) -> Vec<&CommandMeta> {
        self.commands.values().filter(|m| m.category == cat).collect()
    }

    /// Print commands grouped by category.
    pub fn list_commands(&self) {
        for cat in CommandCategory::all() {
            let cmds = self.get_by_category(*cat);
            if cmds.is_empty() {
                continue;
            }
            println!("\n{}:", cat);
            for cmd in cmds {
                let suffix = if cmd.hidden { " [hidden]" } else { "" };
                println!("  {:<12} {}{}", cmd.name, cmd.description, suffix);
            }
        }
    }

    /// Print the same listing as JSON, keyed by category.
    pub fn list_commands_json(&self) -> Result<()> {
        let mut output: BTreeMap<String, Vec<CommandJsonEntry<'_>>> = BTreeMap::new();
        for meta in self.commands.values() {
            output
                .entry(meta.category.to_string())
                .or_default()
                .push(CommandJsonEntry {
                    name: &meta.name,
                    description: &meta.description,
                    aliases: &meta.aliases,
                    hidden: meta.hidden,
                });
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        let mut per_category = BTreeMap::new();
        for meta in self.commands.values() {
            *per_category.entry(meta.category).or_insert(0) += 1;
        }
        RegistryStats {
            total: self.commands.len(),
            hidden: self.commands.values().filter(|m| m.hidden).count(),
            per_category,
        }
    }

    /// Consume the registry and attach every command to the root.
    pub fn build_root(self) -> Command {
        self.commands.into_values().fold(self.root, |root, meta| {
            let command = meta
                .command
                .visible_aliases(meta.aliases)
                .hide(meta.hidden);
            root.subcommand(command)
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

/// Builds a `CommandMeta` from a clap command.
pub struct CommandBuilder {
    command: Command,
    category: CommandCategory,
    description: Option<String>,
    aliases: Vec<String>,
    hidden: bool,
}

impl CommandBuilder {
    /// Start from a clap command; its `about` becomes the description.
    pub fn from_clap(command: Command) -> Self {
        Self {
            command,
            category: CommandCategory::Core,
            description: None,
            aliases: Vec::new(),
            hidden: false,
        }
    }

    pub fn category(mut self, cat: CommandCategory) -> Self {
        self.category = cat;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn build(self) -> CommandMeta {
        let description = self.description.unwrap_or_else(|| {
            self.command
                .get_about()
                .map(|s| s.to_string())
                .unwrap_or_default()
        });
        CommandMeta {
            name: self.command.get_name().to_string(),
            category: self.category,
            description,
            aliases: self.aliases,
            hidden: self.hidden,
            command: self.command,
        }
    }
}
