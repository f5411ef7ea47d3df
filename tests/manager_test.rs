use chrono::{DateTime, Duration, Utc};
use slidersave::{
    codec,
    manager::{SlotLoad, SlotState},
    Area, CurrentProfile, DecodeError, Error, LocalizedString, Profile, ProfileManager,
    SaveConfig, SchemaRemap, TypeTag,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> SaveConfig {
    SaveConfig::new(dir)
}

fn profile_saved_at(name: &str, at: DateTime<Utc>) -> Profile {
    let mut profile = Profile::new(name);
    profile.last_saved = at;
    profile.store.set_int("militaryAttempts", 1);
    profile
}

fn write_slot(dir: &Path, index: usize, profile: &Profile) {
    fs::write(dir.join(format!("slider{}.cat", index)), codec::encode(profile)).unwrap();
}

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

#[test]
fn save_then_reload_reproduces_profile() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::new(config(tmp.path()));

    manager.new_profile(0, "Ana").unwrap();
    {
        let profile = manager.current_mut();
        profile.set_last_area(Area::Military);
        profile.store.set_bool("militaryFailedOnce", true);
        profile.store.set_int("militaryAttempts", 4);
        profile.store.set_string("favouriteTile", "7");
        profile.store.set_localized(
            "oceanRomeoReason",
            LocalizedString::new("The island is in the way!", "La isla estorba!"),
        );
    }
    assert!(manager.save("Finished Restarting Military Sim").unwrap());
    let saved = manager.get_profile(0).unwrap().clone();

    let mut reloaded = ProfileManager::new(config(tmp.path()));
    let report = reloaded.load_all();
    assert_eq!(report.loaded(), vec![0]);
    assert_eq!(reloaded.get_profile(0), Some(&saved));
    assert_eq!(reloaded.slot_state(0), Some(SlotState::Loaded));
    assert_eq!(reloaded.slot_state(1), Some(SlotState::Empty));
}

#[test]
fn most_recently_played_picks_latest_stamp() {
    let tmp = TempDir::new().unwrap();
    let t1 = base_time();
    let t2 = t1 + Duration::hours(1);
    let t3 = t1 + Duration::hours(2);
    write_slot(tmp.path(), 0, &profile_saved_at("a", t1));
    write_slot(tmp.path(), 1, &profile_saved_at("b", t3));
    write_slot(tmp.path(), 2, &profile_saved_at("c", t2));

    let manager = ProfileManager::open(config(tmp.path()));
    assert_eq!(manager.most_recently_played(), Some(1));
}

#[test]
fn most_recently_played_is_none_when_empty() {
    let tmp = TempDir::new().unwrap();
    let manager = ProfileManager::open(config(tmp.path()));
    assert_eq!(manager.most_recently_played(), None);
    assert!(!manager.any_profiles_loaded());
}

#[test]
fn delete_leaves_other_slots_untouched() {
    let tmp = TempDir::new().unwrap();
    for i in 0..3 {
        write_slot(tmp.path(), i, &profile_saved_at(&format!("p{}", i), base_time()));
    }
    fs::write(tmp.path().join("slider1-backup.cat"), b"backup").unwrap();

    let mut manager = ProfileManager::open(config(tmp.path()));
    manager.set_current(1).unwrap();
    manager.delete(1).unwrap();

    assert!(manager.get_profile(1).is_none());
    assert_eq!(manager.get_profile(0).unwrap().name, "p0");
    assert_eq!(manager.get_profile(2).unwrap().name, "p2");
    assert!(manager.binding().is_none());
    assert!(!tmp.path().join("slider1.cat").exists());
    assert!(tmp.path().join("slider0.cat").exists());
    assert!(tmp.path().join("slider2.cat").exists());
    assert!(tmp.path().join("slider1-backup.cat").exists());
}

#[test]
fn corrupt_slot_is_isolated() {
    let tmp = TempDir::new().unwrap();
    write_slot(tmp.path(), 0, &profile_saved_at("p0", base_time()));
    let bytes = codec::encode(&profile_saved_at("p1", base_time()));
    fs::write(tmp.path().join("slider1.cat"), &bytes[..bytes.len() / 2]).unwrap();
    write_slot(tmp.path(), 2, &profile_saved_at("p2", base_time()));

    let mut manager = ProfileManager::new(config(tmp.path()));
    let report = manager.load_all();

    assert_eq!(report.loaded(), vec![0, 2]);
    assert_eq!(report.failed(), vec![1]);
    assert!(matches!(
        report.slots[1],
        SlotLoad::Failed(Error::Decode(DecodeError::Corrupt { .. }))
    ));
    assert_eq!(manager.slot_state(1), Some(SlotState::Empty));
    assert_eq!(manager.get_profile(0).unwrap().name, "p0");
    assert_eq!(manager.get_profile(2).unwrap().name, "p2");
}

#[test]
fn garbage_file_is_isolated() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("slider0.cat"), b"not a save at all").unwrap();
    write_slot(tmp.path(), 2, &profile_saved_at("p2", base_time()));

    let manager = ProfileManager::open(config(tmp.path()));
    assert!(manager.get_profile(0).is_none());
    assert!(manager.get_profile(2).is_some());
}

#[test]
fn schema_mismatch_is_isolated() {
    let tmp = TempDir::new().unwrap();
    write_slot(tmp.path(), 0, &profile_saved_at("p0", base_time()));

    // A build whose table renames the current module loses track of every type
    let renaming = SchemaRemap::new().with_module("SliderScripts", "FutureScripts");
    let mut manager = ProfileManager::new(SaveConfig::new(tmp.path()).with_remap(renaming));
    let report = manager.load_all();

    assert!(matches!(
        report.slots[0],
        SlotLoad::Failed(Error::Decode(DecodeError::SchemaMismatch { .. }))
    ));
    assert!(manager.get_profile(0).is_none());
}

#[test]
fn second_backup_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::new(config(tmp.path()));
    manager.new_profile(0, "Ana").unwrap();
    manager.save("first").unwrap();
    manager.new_profile(2, "Bo").unwrap();
    manager.save("second").unwrap();

    let first = manager.backup_all();
    assert_eq!(first.written, vec![0, 2]);
    assert!(first.skipped.is_empty());

    let second = manager.backup_all();
    assert!(second.written.is_empty());
    assert_eq!(second.skipped, vec![0, 2]);

    manager.current_mut().store.set_bool("moved", true);
    manager.save("third").unwrap();
    let third = manager.backup_all();
    assert_eq!(third.written, vec![2]);
    assert_eq!(third.skipped, vec![0]);
}

#[test]
fn unreadable_backup_is_rewritten() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::new(config(tmp.path()));
    manager.new_profile(0, "Ana").unwrap();
    manager.save("").unwrap();
    fs::write(tmp.path().join("slider0-backup.cat"), b"junk").unwrap();

    let report = manager.backup_all();
    assert_eq!(report.written, vec![0]);
    let bytes = fs::read(tmp.path().join("slider0-backup.cat")).unwrap();
    assert_eq!(
        codec::peek_last_saved(&bytes).unwrap(),
        manager.get_profile(0).unwrap().last_saved
    );
}

#[test]
fn restore_backup_replaces_slot() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::new(config(tmp.path()));
    manager.new_profile(1, "Ana").unwrap();
    manager.current_mut().store.set_int("militaryAttempts", 1);
    manager.save("").unwrap();
    manager.backup_all();

    manager.current_mut().store.set_int("militaryAttempts", 9);
    manager.save("").unwrap();
    manager.restore_backup(1).unwrap();

    assert_eq!(
        manager.get_profile(1).unwrap().store.get_int("militaryAttempts", 0),
        1
    );
    let reopened = ProfileManager::open(config(tmp.path()));
    assert_eq!(
        reopened.get_profile(1).unwrap().store.get_int("militaryAttempts", 0),
        1
    );
}

#[test]
fn transient_profile_is_never_saved() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::open(config(tmp.path()));

    manager.current_mut().store.set_bool("chadFinishedRunningIntoPortal", true);
    assert!(matches!(manager.binding(), Some(CurrentProfile::Transient(_))));
    assert!(!manager.save("cutscene").unwrap());
    assert!(manager.backup_all().written.is_empty());
    assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());

    manager.set_current(0).unwrap();
    assert_eq!(manager.binding(), Some(&CurrentProfile::Bound(0)));
    assert!(!manager.current().store.get_bool("chadFinishedRunningIntoPortal"));
}

#[test]
fn failed_save_leaves_profile_unsaved() {
    let tmp = TempDir::new().unwrap();
    // A file where the save directory should be makes every write fail
    let blocked = tmp.path().join("saves");
    fs::write(&blocked, b"in the way").unwrap();

    let mut manager = ProfileManager::new(config(&blocked));
    manager.set_current(0).unwrap();
    manager.current_mut().store.set_int("militaryAttempts", 3);

    let err = manager.save("blocked").unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    let profile = manager.get_profile(0).unwrap();
    assert!(!profile.has_been_saved());
    assert_eq!(profile.store.get_int("militaryAttempts", 0), 3);
    assert_eq!(manager.slot_state(0), Some(SlotState::Dirty));
}

#[test]
fn old_module_save_loads_through_standard_table() {
    let tmp = TempDir::new().unwrap();
    let mut profile = profile_saved_at("Old", base_time());
    profile.store.set_bool("oceanRJBottleDelivery", true);

    // Rewrite every current tag to the module name older builds used
    let current = codec::encode(&profile);
    let old = replace_all(
        &current,
        b"\x00\x00\x00\x0dSliderScripts",
        b"\x00\x00\x00\x0fAssembly-CSharp",
    );
    assert_ne!(old, current);
    fs::write(tmp.path().join("slider0.cat"), &old).unwrap();

    let manager = ProfileManager::open(config(tmp.path()));
    assert_eq!(manager.get_profile(0), Some(&profile));

    let strict = ProfileManager::open(SaveConfig {
        save_dir: tmp.path().to_path_buf(),
        remap: SchemaRemap::new(),
    });
    assert!(strict.get_profile(0).is_none());
    assert_eq!(
        SchemaRemap::standard().resolve(&TypeTag::new("Assembly-CSharp", "Int32")),
        TypeTag::current("Int32")
    );
}

fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

#[test]
fn invalid_slot_indices_are_errors() {
    let tmp = TempDir::new().unwrap();
    let mut manager = ProfileManager::new(config(tmp.path()));
    assert!(matches!(manager.load_profile(3), Err(Error::InvalidSlot(3))));
    assert!(matches!(manager.restore_backup(4), Err(Error::InvalidSlot(4))));
    assert!(matches!(manager.new_profile(5, "x"), Err(Error::InvalidSlot(5))));
}

#[test]
fn binding_corrupt_slot_keeps_its_backup() {
    let tmp = TempDir::new().unwrap();
    let mut good = profile_saved_at("Ana", base_time());
    good.store.set_int("militaryAttempts", 7);
    let good_bytes = codec::encode(&good);
    fs::write(tmp.path().join("slider1-backup.cat"), &good_bytes).unwrap();
    fs::write(tmp.path().join("slider1.cat"), &good_bytes[..good_bytes.len() / 2]).unwrap();

    let mut manager = ProfileManager::open(config(tmp.path()));
    assert!(manager.get_profile(1).is_none());
    assert_eq!(manager.load_profile(1).unwrap(), Area::Village);

    let report = manager.backup_all();
    assert!(report.written.is_empty());
    assert_eq!(
        fs::read(tmp.path().join("slider1-backup.cat")).unwrap(),
        good_bytes
    );
    assert_eq!(manager.most_recently_played(), None);
    assert!(!manager.any_profiles_loaded());

    // Restoring brings the good copy back
    manager.restore_backup(1).unwrap();
    assert_eq!(manager.get_profile(1), Some(&good));
    assert_eq!(manager.most_recently_played(), Some(1));
}

#[test]
fn save_after_far_future_stamp_succeeds() {
    let tmp = TempDir::new().unwrap();
    let max = DateTime::<Utc>::MAX_UTC;
    let far = DateTime::from_timestamp_millis(max.timestamp_millis()).unwrap();
    write_slot(tmp.path(), 0, &profile_saved_at("Far", far));

    let mut manager = ProfileManager::open(config(tmp.path()));
    assert_eq!(manager.get_profile(0).unwrap().last_saved, far);

    manager.set_current(0).unwrap();
    assert!(manager.save("x").unwrap());
    let saved = manager.get_profile(0).unwrap().last_saved;
    assert!(saved < far);

    let reopened = ProfileManager::open(config(tmp.path()));
    assert_eq!(reopened.get_profile(0).unwrap().last_saved, saved);
}
