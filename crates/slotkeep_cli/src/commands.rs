use clap::Subcommand;
use slotkeep_core::{Archive, CoreError};
use slotkeep_render::{render_json, render_table};
use tracing::info;

/// Operations shared by the one-shot CLI and the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ArchiveCommand {
    /// Show every archived save and the slots currently holding it
    List {
        #[arg(long)]
        json: bool,
    },
    /// Copy a game slot into the archive
    Save {
        slot: String,
        #[arg(default_value = "")]
        memo: String,
        /// Store under this id instead of the next free one
        #[arg(long)]
        id: Option<u64>,
    },
    /// Overwrite a game slot with an archived save
    Load { id: u64, slot: String },
    /// Replace the memo of an archived save
    Memo {
        id: u64,
        #[arg(default_value = "")]
        memo: String,
    },
    /// Rebuild the index after editing the working directory by hand
    #[command(visible_alias = "reload")]
    Rescan,
    /// Archive every save already present in the game's save directory
    Import,
}

/// Runs `command` and returns the text to show the user.
pub fn execute(archive: &mut Archive, command: &ArchiveCommand) -> Result<String, CoreError> {
    match command {
        ArchiveCommand::List { json: true } => Ok(format!("{:#}", render_json(archive))),
        ArchiveCommand::List { json: false } => {
            let table = render_table(archive);
            info!(entries = archive.entries().count(), "listed archive");
            Ok(table.trim_end_matches('\n').to_string())
        }
        ArchiveCommand::Save { slot, memo, id } => {
            let id = archive.save(slot, memo, *id)?;
            Ok(format!("saved slot {slot} to id {id}"))
        }
        ArchiveCommand::Load { id, slot } => {
            archive.load(*id, slot)?;
            let file = file_name_of(archive, *id);
            Ok(format!("loaded id {id} ({file}) into slot {slot}"))
        }
        ArchiveCommand::Memo { id, memo } => {
            let before = file_name_of(archive, *id);
            archive.reannotate(*id, memo)?;
            let after = file_name_of(archive, *id);
            Ok(format!("renamed id {id}: {before} -> {after}"))
        }
        ArchiveCommand::Rescan => {
            archive.rescan()?;
            Ok(format!(
                "rescanned: {} entries, {} slot mappings",
                archive.entries().count(),
                archive.slots().len()
            ))
        }
        ArchiveCommand::Import => {
            let count = archive.bulk_import()?;
            Ok(format!(
                "imported {count} saves, {} entries total",
                archive.entries().count()
            ))
        }
    }
}

fn file_name_of(archive: &Archive, id: u64) -> String {
    archive
        .payload_path(id)
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
