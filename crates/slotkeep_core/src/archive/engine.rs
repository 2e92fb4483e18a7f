use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codec::{GameSaveCodec, MarkerCodec, PayloadCodec};
use crate::config::ArchiveConfig;

use super::error::{CoreError, CoreErrorCode};
use super::index::ArchiveIndex;
use super::types::{ArchiveRow, PayloadEntry};

pub const IMPORT_ANNOTATION: &str = "imported";

#[derive(Debug, Clone)]
struct Codecs {
    game_save: GameSaveCodec,
    payload: PayloadCodec,
    marker: MarkerCodec,
}

/// A save archive rooted at a working directory next to a game's save folder.
///
/// Every operation touches the filesystem first and updates the in-memory
/// index only once the filesystem step has succeeded. Anything left behind by
/// a failed operation is picked up by the next [`Archive::rescan`].
#[derive(Debug)]
pub struct Archive {
    config: ArchiveConfig,
    codecs: Codecs,
    index: ArchiveIndex,
}

impl Archive {
    pub fn open(config: ArchiveConfig) -> Result<Self, CoreError> {
        let codecs = Codecs {
            game_save: GameSaveCodec::new(&config.game_save_template)?,
            payload: PayloadCodec::new(&config.payload_template)?,
            marker: MarkerCodec::new(&config.marker_template)?,
        };

        ensure_game_save_dir(&config.game_save_dir)?;
        fs::create_dir_all(&config.working_dir).map_err(|e| {
            CoreError::configuration(format!(
                "failed to create working directory {}: {e}",
                config.working_dir.display()
            ))
        })?;

        let mut archive = Self {
            config,
            codecs,
            index: ArchiveIndex::default(),
        };
        archive.rescan()?;
        Ok(archive)
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn entries(&self) -> impl Iterator<Item = &PayloadEntry> {
        self.index.payloads().values()
    }

    pub fn slots(&self) -> &BTreeMap<String, u64> {
        self.index.slots()
    }

    pub fn payload_path(&self, id: u64) -> Option<&Path> {
        self.index.payload(id).map(|entry| entry.path.as_path())
    }

    pub fn slot_id(&self, slot: &str) -> Option<u64> {
        self.index.slot_id(slot)
    }

    pub fn game_save_path(&self, slot: &str) -> Result<PathBuf, CoreError> {
        let name = self.codecs.game_save.format(slot)?;
        join_file_name(&self.config.game_save_dir, &name)
    }

    pub fn marker_path(&self, slot: &str, id: u64) -> Result<PathBuf, CoreError> {
        let name = self.codecs.marker.format(slot, id)?;
        join_file_name(&self.config.working_dir, &name)
    }

    fn payload_target(&self, id: u64, annotation: &str) -> Result<PathBuf, CoreError> {
        let name = self.codecs.payload.format(id, annotation)?;
        join_file_name(&self.config.working_dir, &name)
    }

    pub fn rescan(&mut self) -> Result<(), CoreError> {
        ensure_game_save_dir(&self.config.game_save_dir)?;
        self.index.rescan(
            &self.config.working_dir,
            &self.codecs.payload,
            &self.codecs.marker,
        )?;
        info!(
            payloads = self.index.payloads().len(),
            slots = self.index.slots().len(),
            "rescanned {}",
            self.config.working_dir.display()
        );
        Ok(())
    }

    /// Copies the game's save for `slot` into the archive and returns the id
    /// it was stored under. Without an explicit id the next free one is used.
    pub fn save(&mut self, slot: &str, annotation: &str, id: Option<u64>) -> Result<u64, CoreError> {
        let id = match id {
            Some(id) => id,
            None => self.index.next_id()?,
        };

        let source = self.game_save_path(slot)?;
        if !source.is_file() {
            return Err(CoreError::new(
                CoreErrorCode::SourceMissing,
                format!("game save for slot {slot} not found at {}", source.display()),
            ));
        }

        let target = self.payload_target(id, annotation)?;
        fs::copy(&source, &target).map_err(|e| CoreError::filesystem("archive save to", &target, e))?;
        debug!(slot, id, "copied {} to {}", source.display(), target.display());

        if let Some(previous) = self.index.payload(id)
            && previous.path != target
        {
            fs::remove_file(&previous.path)
                .map_err(|e| CoreError::filesystem("replace", &previous.path, e))?;
            info!(id, "replaced {}", previous.path.display());
        }
        self.index.insert_payload(PayloadEntry {
            id,
            annotation: annotation.to_string(),
            path: target,
        });

        self.point_slot(slot, id)?;
        info!(slot, id, annotation, "saved slot to archive");
        Ok(id)
    }

    /// Overwrites the game's save for `slot` with archived entry `id`.
    pub fn load(&mut self, id: u64, slot: &str) -> Result<(), CoreError> {
        let source = self
            .index
            .payload(id)
            .map(|entry| entry.path.clone())
            .ok_or_else(|| CoreError::unknown_id(id))?;

        let target = self.game_save_path(slot)?;
        fs::copy(&source, &target).map_err(|e| CoreError::filesystem("restore save to", &target, e))?;

        self.point_slot(slot, id)?;
        info!(slot, id, "loaded archive entry into slot");
        Ok(())
    }

    pub fn reannotate(&mut self, id: u64, annotation: &str) -> Result<(), CoreError> {
        let current = self
            .index
            .payload(id)
            .map(|entry| entry.path.clone())
            .ok_or_else(|| CoreError::unknown_id(id))?;

        let target = self.payload_target(id, annotation)?;
        if target != current {
            fs::rename(&current, &target).map_err(|e| CoreError::filesystem("rename", &current, e))?;
        }
        info!(id, "renamed {} to {}", current.display(), target.display());

        self.index.insert_payload(PayloadEntry {
            id,
            annotation: annotation.to_string(),
            path: target,
        });
        Ok(())
    }

    /// Saves every slot found in the game's save directory under a fresh id.
    /// Stops at the first failure; slots saved before it stay archived.
    pub fn bulk_import(&mut self) -> Result<usize, CoreError> {
        let dir = self.config.game_save_dir.clone();
        let entries = fs::read_dir(&dir).map_err(|e| CoreError::filesystem("read", &dir, e))?;

        let mut names = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|e| CoreError::filesystem("read entry in", &dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();

        let slots: Vec<String> = names
            .iter()
            .filter_map(|name| self.codecs.game_save.slot(name))
            .map(ToOwned::to_owned)
            .collect();

        for slot in &slots {
            self.save(slot, IMPORT_ANNOTATION, None)?;
        }
        info!(count = slots.len(), "bulk import finished");
        Ok(slots.len())
    }

    /// Payload entries in id order, each joined with the slots that hold it.
    pub fn rows(&self) -> Vec<ArchiveRow> {
        let mut slots_by_id: BTreeMap<u64, Vec<String>> = BTreeMap::new();
        for (slot, &id) in self.index.slots() {
            slots_by_id.entry(id).or_default().push(slot.clone());
        }

        self.entries()
            .map(|entry| ArchiveRow {
                id: entry.id,
                slots: slots_by_id.remove(&entry.id).unwrap_or_default(),
                annotation: entry.annotation.clone(),
                file_name: entry.file_name(),
            })
            .collect()
    }

    /// Makes the marker for `slot` name `id`, renaming the slot's previous
    /// marker so that a slot never has more than one.
    fn point_slot(&mut self, slot: &str, id: u64) -> Result<(), CoreError> {
        let marker = self.marker_path(slot, id)?;

        match self.index.slot_id(slot) {
            Some(previous_id) if previous_id != id => {
                let previous = self.marker_path(slot, previous_id)?;
                if previous.is_file() {
                    fs::rename(&previous, &marker)
                        .map_err(|e| CoreError::filesystem("rename marker", &previous, e))?;
                    debug!(slot, from = previous_id, to = id, "moved slot marker");
                } else {
                    warn!(slot, "marker {} vanished, recreating", previous.display());
                    touch(&marker)?;
                }
            }
            _ => touch(&marker)?,
        }

        self.index.set_slot(slot, id);
        Ok(())
    }
}

fn ensure_game_save_dir(dir: &Path) -> Result<(), CoreError> {
    if !dir.is_dir() {
        return Err(CoreError::configuration(format!(
            "game save directory {} does not exist or is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

fn join_file_name(dir: &Path, name: &str) -> Result<PathBuf, CoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CoreError::new(
            CoreErrorCode::FilesystemOperation,
            format!("'{name}' is not a valid file name"),
        ));
    }
    Ok(dir.join(name))
}

fn touch(path: &Path) -> Result<(), CoreError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|e| CoreError::filesystem("create marker", path, e))
}
