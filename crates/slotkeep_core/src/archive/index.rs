use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::codec::{MarkerCodec, PayloadCodec};

use super::error::{CoreError, CoreErrorCode};
use super::types::PayloadEntry;

/// In-memory view of the working directory. Always rebuildable from disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveIndex {
    payloads: BTreeMap<u64, PayloadEntry>,
    slots: BTreeMap<String, u64>,
}

impl ArchiveIndex {
    pub fn payloads(&self) -> &BTreeMap<u64, PayloadEntry> {
        &self.payloads
    }

    pub fn slots(&self) -> &BTreeMap<String, u64> {
        &self.slots
    }

    pub fn payload(&self, id: u64) -> Option<&PayloadEntry> {
        self.payloads.get(&id)
    }

    pub fn slot_id(&self, slot: &str) -> Option<u64> {
        self.slots.get(slot).copied()
    }

    /// One past the highest archived id, or 0 for an empty archive.
    pub fn next_id(&self) -> Result<u64, CoreError> {
        match self.payloads.last_key_value() {
            None => Ok(0),
            Some((&id, _)) => id.checked_add(1).ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::FilesystemOperation,
                    format!("id space exhausted: highest archived id is {id}, pass an explicit id"),
                )
            }),
        }
    }

    pub(crate) fn insert_payload(&mut self, entry: PayloadEntry) {
        self.payloads.insert(entry.id, entry);
    }

    pub(crate) fn set_slot(&mut self, slot: &str, id: u64) {
        self.slots.insert(slot.to_string(), id);
    }

    /// Clears both tables and classifies every regular file in `dir`, visiting
    /// names in sorted order so that the first of two conflicting files wins.
    pub(crate) fn rescan(
        &mut self,
        dir: &Path,
        payload: &PayloadCodec,
        marker: &MarkerCodec,
    ) -> Result<(), CoreError> {
        self.payloads.clear();
        self.slots.clear();

        let entries = fs::read_dir(dir).map_err(|e| {
            CoreError::configuration(format!("failed to read {}: {e}", dir.display()))
        })?;
        let mut names = Vec::new();
        for entry_result in entries {
            let entry = entry_result.map_err(|e| {
                CoreError::configuration(format!("failed to read entry in {}: {e}", dir.display()))
            })?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "skipping non UTF-8 file name"),
            }
        }
        names.sort();

        for name in &names {
            self.classify(dir, name, payload, marker);
        }
        Ok(())
    }

    fn classify(&mut self, dir: &Path, name: &str, payload: &PayloadCodec, marker: &MarkerCodec) {
        if let Some((id_text, annotation)) = payload.decode(name) {
            match id_text.parse::<u64>() {
                Ok(id) => {
                    match self.payloads.entry(id) {
                        Entry::Vacant(vacant) => {
                            vacant.insert(PayloadEntry {
                                id,
                                annotation: annotation.to_string(),
                                path: dir.join(name),
                            });
                        }
                        Entry::Occupied(existing) => warn!(
                            file = name,
                            kept = %existing.get().path.display(),
                            "ignoring second payload for id {id}"
                        ),
                    }
                    return;
                }
                Err(_) => debug!(file = name, "payload pattern matched but id is not numeric"),
            }
        }

        if let Some((slot, id_text)) = marker.decode(name) {
            let Ok(id) = id_text.parse::<u64>() else {
                warn!(file = name, "ignoring marker with non-numeric id '{id_text}'");
                return;
            };
            match self.slots.entry(slot.to_string()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(id);
                }
                Entry::Occupied(existing) => warn!(
                    file = name,
                    kept = *existing.get(),
                    "ignoring second marker for slot '{slot}'"
                ),
            }
            return;
        }

        debug!(file = name, "not an archive file");
    }
}
