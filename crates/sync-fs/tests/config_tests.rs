use assert_fs::prelude::*;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sync_fs::{ConfigStore, Error, FileSystemType, FsConfig};

fn sample() -> FsConfig {
    FsConfig {
        notify_delay_ds: 12,
        nonblocking_open: false,
        read_padding: 8,
        fs_type_override: Some(FileSystemType::Exfat),
    }
}

#[rstest]
#[case("settings.toml")]
#[case("settings.json")]
#[case("settings.yaml")]
#[case("settings.yml")]
fn test_save_and_load_each_format(#[case] name: &str) {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child(name);
    let store = ConfigStore::new();

    store.save(file.path(), &sample()).unwrap();
    file.assert(predicate::path::exists());

    let loaded: FsConfig = store.load(file.path()).unwrap();
    assert_eq!(loaded, sample());
}

#[test]
fn test_toml_output_names_fs_type_in_lowercase() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("fs.toml");

    ConfigStore::new().save(file.path(), &sample()).unwrap();
    file.assert(predicate::str::contains("fs_type_override = \"exfat\""));
}

#[test]
fn test_malformed_file_reports_format() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("broken.json");
    file.write_str("{ not json").unwrap();

    let err = ConfigStore::new().load::<FsConfig>(file.path()).unwrap_err();
    match err {
        Error::ConfigParse { format, .. } => assert_eq!(format, "JSON"),
        other => panic!("unexpected error: {other}"),
    }
}
