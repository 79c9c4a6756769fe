//! Gallery CLI command: unlock with the access key, then browse and manage media.
//!
//! Subcommands: list, upload, preview, download, delete.

use std::path::{Path, PathBuf};

use clap::{Arg, ArgMatches, Command};
use dialoguer::{theme::ColorfulTheme, Confirm, Password};

use crate::cli::{wants_json, CommandBuilder, CommandCategory, CommandMeta};
use crate::cloud::dropbox::UploadRequest;
use crate::commands::registry_cmd::ServiceRegistry;
use crate::config::simplified::SimplifiedConfig;
use crate::errors::{FolioError, Result};
use crate::gallery::{Gallery, GalleryItem, NotificationLevel};
use crate::output;
use crate::output::progress::{create_spinner, create_transfer_progress};

pub fn gallery_command() -> Command {
    Command::new("gallery")
        .about("Browse, upload and manage the Dropbox media gallery")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("passcode")
                .long("passcode")
                .short('p')
                .global(true)
                .help("Access key; prompted for when omitted"),
        )
        .subcommand(
            Command::new("list")
                .about("List photos and videos")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .value_parser(["photo", "video"])
                        .help("Only show one kind of media"),
                ),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a local file into the gallery folder")
                .arg(Arg::new("file").required(true).value_parser(clap::value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("preview")
                .about("Print a temporary link for viewing a file")
                .arg(Arg::new("path").required(true)),
        )
        .subcommand(
            Command::new("download")
                .about("Download a file")
                .arg(Arg::new("path").required(true))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Destination file (defaults to ~/Downloads/<name>)"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a file from Dropbox")
                .arg(Arg::new("path").required(true))
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(clap::ArgAction::SetTrue)
                        .help("Skip the confirmation prompt"),
                ),
        )
}

pub fn gallery_meta() -> CommandMeta {
    CommandBuilder::from_clap(gallery_command())
        .category(CommandCategory::Media)
        .aliases(&["g"])
        .build()
}

fn prompt_passcode() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Access key")
        .interact()
        .map_err(|e| FolioError::Application(format!("Passcode prompt error: {e}")))
}

/// Print and clear pending notifications.
///
/// Error notifications are skipped; the failing call's error is reported
/// by `handle_command_error` instead.
fn flush_notifications(gallery: &mut Gallery, json: bool) {
    for note in gallery.take_notifications() {
        if json {
            continue;
        }
        match note.level {
            NotificationLevel::Success => output::success(&note.message),
            NotificationLevel::Info => output::info(&note.message),
            NotificationLevel::Error => {}
        }
    }
}

fn print_items<'a>(items: impl Iterator<Item = &'a GalleryItem>) {
    let mut count = 0;
    for item in items {
        println!("  {:<6} {:>10}  {}", item.kind, item.size_display(), item.path);
        count += 1;
    }
    if count == 0 {
        output::warning("No photos or videos found");
    }
}

/// Default download target: the download directory plus the remote file name.
fn default_destination(download_dir: &Path, remote: &str) -> PathBuf {
    let name = remote.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("download");
    download_dir.join(name)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| FolioError::Command(format!("Missing argument: {id}")))
}

/// Handle the `gallery` command.
pub async fn handle_gallery(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    let json = wants_json(matches);
    let (sub_name, sub) = matches
        .subcommand()
        .ok_or_else(|| FolioError::Command("Unknown gallery subcommand".into()))?;

    // Fail on missing credentials before asking for the access key.
    let mut gallery = services.gallery().await?;
    let passcode = match sub.get_one::<String>("passcode") {
        Some(p) => p.clone(),
        None => prompt_passcode()?,
    };

    let spinner = create_spinner("Loading gallery...", json);
    let unlocked = gallery.unlock(&passcode).await;
    spinner.finish_and_clear();
    flush_notifications(&mut gallery, json);
    unlocked?;

    let result = run_subcommand(&mut gallery, sub_name, sub, json).await;
    flush_notifications(&mut gallery, json);
    result
}

async fn run_subcommand(gallery: &mut Gallery, name: &str, sub: &ArgMatches, json: bool) -> Result<()> {
    match name {
        "list" => {
            let kind = sub.get_one::<String>("kind").map(String::as_str);
            let items: Vec<&GalleryItem> = match kind {
                Some("photo") => gallery.photos().collect(),
                Some("video") => gallery.videos().collect(),
                _ => gallery.items().iter().collect(),
            };
            if json {
                output::json(&items)?;
            } else {
                print_items(items.into_iter());
            }
        }
        "upload" => {
            let file = sub
                .get_one::<PathBuf>("file")
                .ok_or_else(|| FolioError::Command("Missing argument: file".into()))?;
            let request = UploadRequest::from_path(file).await?;
            let spinner = create_spinner(&format!("Uploading {}...", request.name), json);
            let uploaded = gallery.upload(request).await;
            spinner.finish_and_clear();
            let uploaded = uploaded?;
            if json {
                output::json(&uploaded)?;
            } else {
                let shown = uploaded.path_display.as_deref().unwrap_or(&uploaded.name);
                println!("{}", shown);
            }
        }
        "preview" => {
            let link = gallery.preview(required(sub, "path")?).await?;
            if json {
                output::json(&serde_json::json!({ "link": link }))?;
            } else {
                println!("{}", link);
            }
        }
        "download" => {
            let path = required(sub, "path")?;
            let dest = match sub.get_one::<PathBuf>("output") {
                Some(p) => p.clone(),
                None => default_destination(&SimplifiedConfig::get().download_dir, path),
            };
            let bar = create_transfer_progress(0);
            if json {
                bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
            }
            let written = gallery
                .download_with_progress(path, &dest, |done, total| {
                    if let Some(total) = total {
                        bar.set_length(total);
                    }
                    bar.set_position(done);
                })
                .await;
            bar.finish_and_clear();
            let written = written?;
            if json {
                output::json(&serde_json::json!({ "path": dest, "bytes": written }))?;
            } else {
                output::success(&format!("Saved {} ({} bytes)", dest.display(), written));
            }
        }
        "delete" => {
            let path = required(sub, "path")?;
            if !sub.get_flag("yes") {
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("Delete {path} from Dropbox?"))
                    .default(false)
                    .interact_opt()
                    .map_err(|e| FolioError::Application(format!("Confirm prompt error: {e}")))?;
                if confirmed != Some(true) {
                    output::info("Cancelled");
                    return Ok(());
                }
            }
            gallery.delete(path).await?;
        }
        other => {
            return Err(FolioError::Command(format!("Unknown gallery subcommand: {other}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_meta() {
        let meta = gallery_meta();
        assert_eq!(meta.name, "gallery");
        assert_eq!(meta.category, CommandCategory::Media);
        assert_eq!(meta.aliases, vec!["g"]);
    }

    #[test]
    fn test_passcode_accepted_before_or_after_subcommand() {
        let m = gallery_command()
            .try_get_matches_from(["gallery", "--passcode", "1234", "list"])
            .unwrap();
        let (_, sub) = m.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("passcode").unwrap(), "1234");

        let m = gallery_command()
            .try_get_matches_from(["gallery", "list", "-p", "1234"])
            .unwrap();
        let (_, sub) = m.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("passcode").unwrap(), "1234");
    }

    #[test]
    fn test_download_output_flag() {
        let m = gallery_command()
            .try_get_matches_from(["gallery", "download", "/clip.mp4", "-o", "/tmp/c.mp4"])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "download");
        assert_eq!(sub.get_one::<PathBuf>("output").unwrap(), &PathBuf::from("/tmp/c.mp4"));
    }

    #[test]
    fn test_list_kind_is_validated() {
        assert!(gallery_command()
            .try_get_matches_from(["gallery", "list", "--kind", "audio"])
            .is_err());
    }

    #[test]
    fn test_default_destination_uses_remote_name() {
        let dir = Path::new("/home/me/Downloads");
        assert_eq!(
            default_destination(dir, "/Trips/Beach.JPG"),
            PathBuf::from("/home/me/Downloads/Beach.JPG")
        );
        assert_eq!(default_destination(dir, "/"), PathBuf::from("/home/me/Downloads/download"));
    }
}
