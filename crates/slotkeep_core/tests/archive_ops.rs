use std::fs;
use std::path::{Path, PathBuf};

use slotkeep_core::archive::IMPORT_ANNOTATION;
use slotkeep_core::{Archive, ArchiveConfig, CoreErrorCode};
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    game_dir: PathBuf,
    work_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let game_dir = root.path().join("save");
        let work_dir = root.path().join("save_manager");
        fs::create_dir_all(&game_dir).expect("failed to create game save dir");
        Self {
            _root: root,
            game_dir,
            work_dir,
        }
    }

    fn config(&self) -> ArchiveConfig {
        ArchiveConfig::new(&self.game_dir, &self.work_dir)
    }

    fn open(&self) -> Archive {
        Archive::open(self.config()).expect("archive should open")
    }

    fn write_slot(&self, slot: &str, bytes: &[u8]) {
        fs::write(self.game_dir.join(format!("file{slot}.rpgsave")), bytes)
            .expect("failed to write game save");
    }

    fn read_slot(&self, slot: &str) -> Vec<u8> {
        fs::read(self.game_dir.join(format!("file{slot}.rpgsave"))).expect("game save should exist")
    }

    fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    fn markers_for(&self, slot: &str) -> Vec<String> {
        let prefix = format!("slot_{slot}-id_");
        file_names(&self.work_dir)
            .into_iter()
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".mapping.sm"))
            .collect()
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("dir should be readable")
        .map(|entry| {
            entry
                .expect("entry should be readable")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

#[test]
fn empty_working_dir_yields_empty_index() {
    let fx = Fixture::new();
    let mut archive = fx.open();
    archive.rescan().expect("rescan should succeed");

    assert_eq!(archive.entries().count(), 0);
    assert!(archive.slots().is_empty());
    assert!(fx.work_dir.is_dir(), "working dir should be created on open");
}

#[test]
fn open_requires_game_save_dir() {
    let fx = Fixture::new();
    let config = ArchiveConfig::new(fx.game_dir.join("missing"), &fx.work_dir);

    let err = Archive::open(config).expect_err("missing game save dir must be fatal");
    assert_eq!(err.code, CoreErrorCode::Configuration);
}

#[test]
fn open_rejects_misordered_templates() {
    let fx = Fixture::new();
    let mut config = fx.config();
    config.payload_template = "{memo}_{id}.save.sm".to_string();
    let err = Archive::open(config).expect_err("memo before id must be rejected");
    assert_eq!(err.code, CoreErrorCode::Configuration);

    let mut config = fx.config();
    config.marker_template = "id_{id}-slot_{slot}.mapping.sm".to_string();
    let err = Archive::open(config).expect_err("id before slot must be rejected");
    assert_eq!(err.code, CoreErrorCode::Configuration);

    let mut config = fx.config();
    config.game_save_template = "file.rpgsave".to_string();
    let err = Archive::open(config).expect_err("game save template needs a slot");
    assert_eq!(err.code, CoreErrorCode::Configuration);
}

#[test]
fn first_save_gets_id_zero_and_a_marker() {
    let fx = Fixture::new();
    fx.write_slot("1", b"slot one bytes");
    let mut archive = fx.open();

    let id = archive.save("1", "beforeBoss", None).expect("save should succeed");

    assert_eq!(id, 0);
    let payload = fx.work_file("0_beforeBoss.save.sm");
    assert_eq!(fs::read(&payload).expect("payload should exist"), b"slot one bytes");
    assert_eq!(archive.payload_path(0), Some(payload.as_path()));

    let marker = fx.work_file("slot_1-id_0.mapping.sm");
    assert_eq!(fs::metadata(&marker).expect("marker should exist").len(), 0);
    assert_eq!(archive.slot_id("1"), Some(0));
}

#[test]
fn ids_are_allocated_after_the_highest_existing_one() {
    let fx = Fixture::new();
    fx.write_slot("1", b"a");
    let mut archive = fx.open();

    assert_eq!(archive.save("1", "a", None).unwrap(), 0);
    assert_eq!(archive.save("1", "b", None).unwrap(), 1);
    assert_eq!(archive.save("1", "c", Some(10)).unwrap(), 10);
    assert_eq!(archive.save("1", "d", None).unwrap(), 11);

    let ids: Vec<u64> = archive.entries().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![0, 1, 10, 11]);
}

#[test]
fn allocation_after_the_largest_id_fails_without_touching_entries() {
    let fx = Fixture::new();
    fx.write_slot("1", b"new");
    fs::create_dir_all(&fx.work_dir).unwrap();
    fs::write(fx.work_file("0_keep.save.sm"), b"keep").unwrap();
    fs::write(fx.work_file(&format!("{}_max.save.sm", u64::MAX)), b"max").unwrap();
    let mut archive = fx.open();
    let before = archive.index().clone();

    let err = archive.save("1", "x", None).expect_err("no id is left to allocate");

    assert_eq!(err.code, CoreErrorCode::FilesystemOperation);
    assert_eq!(fs::read(fx.work_file("0_keep.save.sm")).unwrap(), b"keep");
    assert_eq!(archive.index(), &before);
    assert!(fx.markers_for("1").is_empty());

    let err = archive.bulk_import().expect_err("import allocates ids too");
    assert_eq!(err.code, CoreErrorCode::FilesystemOperation);
    assert_eq!(file_names(&fx.work_dir).len(), 2);

    assert_eq!(archive.save("1", "x", Some(5)).unwrap(), 5);
}

#[test]
fn saving_over_an_existing_id_keeps_one_payload_file() {
    let fx = Fixture::new();
    fx.write_slot("1", b"old");
    let mut archive = fx.open();
    archive.save("1", "first", None).unwrap();

    fx.write_slot("1", b"new");
    let id = archive.save("1", "second", Some(0)).unwrap();

    assert_eq!(id, 0);
    assert!(!fx.work_file("0_first.save.sm").exists());
    assert_eq!(fs::read(fx.work_file("0_second.save.sm")).unwrap(), b"new");
    assert_eq!(archive.entries().count(), 1);
    assert_eq!(fx.markers_for("1"), vec!["slot_1-id_0.mapping.sm"]);
}

#[test]
fn save_without_game_file_reports_missing_source() {
    let fx = Fixture::new();
    let mut archive = fx.open();

    let err = archive.save("7", "nothing", None).expect_err("slot 7 does not exist");

    assert_eq!(err.code, CoreErrorCode::SourceMissing);
    assert_eq!(archive.entries().count(), 0);
    assert!(archive.slots().is_empty());
    assert!(file_names(&fx.work_dir).is_empty());
}

#[test]
fn save_with_unusable_annotation_records_nothing() {
    let fx = Fixture::new();
    fx.write_slot("1", b"bytes");
    let mut archive = fx.open();

    let err = archive
        .save("1", "boss/room", None)
        .expect_err("path separator cannot appear in a file name");

    assert_eq!(err.code, CoreErrorCode::FilesystemOperation);
    assert_eq!(archive.entries().count(), 0);
    assert!(archive.slots().is_empty());
    assert!(file_names(&fx.work_dir).is_empty());
}

#[test]
fn loading_into_a_fresh_slot_creates_its_marker() {
    let fx = Fixture::new();
    fx.write_slot("1", b"checkpoint");
    let mut archive = fx.open();
    archive.save("1", "x", None).unwrap();

    archive.load(0, "2").expect("load should succeed");

    assert_eq!(fx.read_slot("2"), b"checkpoint");
    assert_eq!(fx.markers_for("2"), vec!["slot_2-id_0.mapping.sm"]);
    assert_eq!(fx.markers_for("1"), vec!["slot_1-id_0.mapping.sm"]);
    assert_eq!(archive.slot_id("2"), Some(0));
    assert_eq!(archive.slot_id("1"), Some(0));
}

#[test]
fn saving_a_new_entry_moves_the_slot_marker() {
    let fx = Fixture::new();
    fx.write_slot("1", b"first");
    let mut archive = fx.open();
    archive.save("1", "first", None).unwrap();

    fx.write_slot("1", b"second");
    let id = archive.save("1", "second", None).unwrap();

    assert_eq!(id, 1);
    assert_eq!(fx.markers_for("1"), vec!["slot_1-id_1.mapping.sm"]);
    assert_eq!(archive.slot_id("1"), Some(1));
    assert!(fx.work_file("0_first.save.sm").exists());
}

#[test]
fn loading_over_a_mapped_slot_overwrites_and_renames() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    fx.write_slot("2", b"two");
    let mut archive = fx.open();
    archive.save("1", "one", None).unwrap();
    archive.save("2", "two", None).unwrap();

    archive.load(0, "2").unwrap();

    assert_eq!(fx.read_slot("2"), b"one");
    assert_eq!(fx.markers_for("2"), vec!["slot_2-id_0.mapping.sm"]);
    assert_eq!(archive.slot_id("2"), Some(0));
    assert_eq!(fs::read(fx.work_file("1_two.save.sm")).unwrap(), b"two");
}

#[test]
fn loading_the_same_entry_twice_is_idempotent() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    let mut archive = fx.open();
    archive.save("1", "one", None).unwrap();

    archive.load(0, "1").unwrap();
    archive.load(0, "1").unwrap();

    assert_eq!(fx.markers_for("1"), vec!["slot_1-id_0.mapping.sm"]);
}

#[test]
fn load_recreates_a_marker_deleted_behind_its_back() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    let mut archive = fx.open();
    archive.save("1", "one", None).unwrap();
    archive.save("1", "two", None).unwrap();
    fs::remove_file(fx.work_file("slot_1-id_1.mapping.sm")).unwrap();

    archive.load(0, "1").expect("load should tolerate a missing marker");

    assert_eq!(fx.markers_for("1"), vec!["slot_1-id_0.mapping.sm"]);
}

#[test]
fn load_rejects_unknown_id() {
    let fx = Fixture::new();
    let mut archive = fx.open();

    let err = archive.load(3, "1").expect_err("id 3 was never saved");

    assert_eq!(err.code, CoreErrorCode::UnknownId);
    assert!(!fx.game_dir.join("file1.rpgsave").exists());
    assert!(archive.slots().is_empty());
}

#[test]
fn reannotate_renames_the_payload_only() {
    let fx = Fixture::new();
    fx.write_slot("1", b"content");
    let mut archive = fx.open();
    archive.save("1", "beforeBoss", None).unwrap();

    archive.reannotate(0, "afterBoss").expect("reannotate should succeed");

    let renamed = fx.work_file("0_afterBoss.save.sm");
    assert_eq!(archive.payload_path(0), Some(renamed.as_path()));
    assert_eq!(fs::read(&renamed).unwrap(), b"content");
    assert!(!fx.work_file("0_beforeBoss.save.sm").exists());
    assert_eq!(archive.slot_id("1"), Some(0));

    let entry = archive.entries().next().expect("entry should remain");
    assert_eq!(entry.annotation, "afterBoss");
}

#[test]
fn reannotate_with_same_text_is_a_no_op() {
    let fx = Fixture::new();
    fx.write_slot("1", b"content");
    let mut archive = fx.open();
    archive.save("1", "same", None).unwrap();

    archive.reannotate(0, "same").unwrap();

    assert!(fx.work_file("0_same.save.sm").exists());
}

#[test]
fn reannotate_rejects_unknown_id() {
    let fx = Fixture::new();
    let mut archive = fx.open();

    let err = archive.reannotate(0, "memo").expect_err("no entries exist");
    assert_eq!(err.code, CoreErrorCode::UnknownId);
}

#[test]
fn bulk_import_saves_each_matching_slot() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    fx.write_slot("2", b"two");
    fx.write_slot("10", b"ten");
    fs::write(fx.game_dir.join("global.rpgsave"), b"global").unwrap();
    fs::write(fx.game_dir.join("config.rpgsave"), b"config").unwrap();
    fs::create_dir(fx.game_dir.join("file9.rpgsave")).unwrap();
    let mut archive = fx.open();

    let count = archive.bulk_import().expect("bulk import should succeed");

    assert_eq!(count, 3);
    assert_eq!(archive.slot_id("1"), Some(0));
    assert_eq!(archive.slot_id("10"), Some(1));
    assert_eq!(archive.slot_id("2"), Some(2));
    assert!(archive.entries().all(|entry| entry.annotation == IMPORT_ANNOTATION));
    assert_eq!(
        fs::read(fx.work_file(&format!("1_{IMPORT_ANNOTATION}.save.sm"))).unwrap(),
        b"ten"
    );
}

#[test]
fn every_touched_slot_keeps_exactly_one_marker() {
    let fx = Fixture::new();
    for slot in ["1", "2", "3"] {
        fx.write_slot(slot, slot.as_bytes());
    }
    let mut archive = fx.open();

    archive.save("1", "a", None).unwrap();
    archive.save("2", "b", None).unwrap();
    archive.load(0, "3").unwrap();
    archive.save("1", "c", None).unwrap();
    archive.load(1, "1").unwrap();
    archive.load(2, "2").unwrap();
    archive.save("3", "d", Some(7)).unwrap();

    for (slot, &id) in archive.slots() {
        assert_eq!(
            fx.markers_for(slot),
            vec![format!("slot_{slot}-id_{id}.mapping.sm")],
            "slot {slot}"
        );
    }
    assert_eq!(archive.slots().len(), 3);
}

#[test]
fn reopening_reconstructs_the_same_index() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    fx.write_slot("2", b"two");
    let mut archive = fx.open();
    archive.save("1", "a", None).unwrap();
    archive.save("2", "b", None).unwrap();
    archive.load(0, "2").unwrap();
    archive.reannotate(1, "renamed").unwrap();

    let reopened = fx.open();
    assert_eq!(reopened.index(), archive.index());

    let before = archive.index().clone();
    archive.rescan().unwrap();
    archive.rescan().unwrap();
    assert_eq!(archive.index(), &before);
}

#[test]
fn rows_join_slots_onto_entries() {
    let fx = Fixture::new();
    fx.write_slot("1", b"one");
    let mut archive = fx.open();
    archive.save("1", "a", None).unwrap();
    archive.save("1", "b", None).unwrap();
    archive.load(1, "2").unwrap();

    let rows = archive.rows();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, 0);
    assert!(rows[0].slots.is_empty());
    assert_eq!(rows[0].file_name, "0_a.save.sm");
    assert_eq!(rows[1].slots, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(rows[1].annotation, "b");
}
