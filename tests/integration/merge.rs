//! Merging real archives into a skins folder.

use std::time::{Duration, SystemTime};

use skin_updater::merge::{ExtractionResult, MergeError, MergePlanner};
use skin_updater::test_utils::ZipFixture;
use skin_updater::test_utils::fixtures::{DEFAULT_STAMP, stamp_to_system_time};
use tempfile::TempDir;

const THEME: &str = "Metro for Steam";

struct Workspace {
    _temp: TempDir,
    archive: std::path::PathBuf,
    skins: std::path::PathBuf,
}

fn workspace(fixture: &ZipFixture) -> Workspace {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("package.zip");
    let skins = temp.path().join("skins");
    std::fs::create_dir(&skins).unwrap();
    fixture.write_to(&archive).unwrap();
    Workspace {
        _temp: temp,
        archive,
        skins,
    }
}

#[test]
fn test_wrapper_folder_is_renamed_to_theme() {
    let fixture = ZipFixture::new()
        .file("Theme/A/file.txt", "content")
        .dir("Theme/A/sub/")
        .file("Other/ignored.txt", "ignored");
    let ws = workspace(&fixture);

    let result = MergePlanner::new("Theme", &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(
        result,
        ExtractionResult {
            files_extracted: 1,
            folders_extracted: 1,
            skipped: 0,
        }
    );
    assert!(ws.skins.join("Theme/sub").is_dir());
    assert_eq!(std::fs::read_to_string(ws.skins.join("Theme/file.txt")).unwrap(), "content");
    assert!(!ws.skins.join("Other").exists());
    assert!(!ws.skins.join("Theme/A").exists());
}

#[test]
fn test_leading_directory_entry_picks_root_folder() {
    let fixture = ZipFixture::new().dir("Theme/A/sub/").file("Theme/A/file.txt", "content");
    let ws = workspace(&fixture);

    let result = MergePlanner::new("Theme", &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(result.files_extracted, 1);
    assert_eq!(result.folders_extracted, 1);
    assert!(ws.skins.join("Theme/A/file.txt").is_file());
    assert!(!ws.skins.join("Theme/sub").exists());
}

#[test]
fn test_theme_release_merge() {
    let ws = workspace(&ZipFixture::theme_release("Metro for Steam 4.2.1"));

    let result = MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(result.files_extracted, 3);
    assert_eq!(result.folders_extracted, 2);
    assert_eq!(result.skipped, 0);

    let theme = ws.skins.join(THEME);
    assert_eq!(std::fs::read_to_string(theme.join("steam.styles")).unwrap(), "steam styles");
    assert_eq!(std::fs::read_to_string(theme.join("resource/menus.res")).unwrap(), "menus");
    assert!(!ws.skins.join("Extras").exists());
    assert!(!ws.skins.join("Metro for Steam 4.2.1").exists());
}

#[test]
fn test_written_files_keep_archive_timestamp() {
    let ws = workspace(&ZipFixture::theme_release("Metro for Steam 4.2.1"));
    MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();

    let modified = std::fs::metadata(ws.skins.join(THEME).join("steam.styles")).unwrap().modified().unwrap();
    let expected = stamp_to_system_time(DEFAULT_STAMP).unwrap();
    let drift = modified.duration_since(expected).unwrap_or_else(|e| e.duration());
    assert!(drift <= Duration::from_secs(2), "drift of {drift:?}");
}

#[test]
fn test_second_merge_keeps_custom_styles() {
    let ws = workspace(&ZipFixture::theme_release("Metro for Steam 4.2.1"));
    let planner = MergePlanner::new(THEME, &ws.skins);

    let first = planner.merge(&ws.archive).unwrap();
    assert_eq!(first.skipped, 0);

    let custom = ws.skins.join(THEME).join("custom.styles");
    std::fs::write(&custom, "my tweaks").unwrap();

    let second = planner.merge(&ws.archive).unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.files_extracted, first.files_extracted - 1);
    assert_eq!(std::fs::read_to_string(&custom).unwrap(), "my tweaks");
}

#[test]
fn test_unchanged_second_merge_skips_custom_styles() {
    let ws = workspace(&ZipFixture::theme_release("Metro for Steam 4.2.1"));
    let planner = MergePlanner::new(THEME, &ws.skins);

    let first = planner.merge(&ws.archive).unwrap();
    let after_first = installed_files(&ws.skins);

    let second = planner.merge(&ws.archive).unwrap();
    assert!(second.skipped >= 1);
    assert_eq!(second.files_extracted + second.skipped, first.files_extracted);
    assert_eq!(second.folders_extracted, first.folders_extracted);
    assert_eq!(installed_files(&ws.skins), after_first);
}

fn installed_files(root: &std::path::Path) -> Vec<(std::path::PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let content = std::fs::read(&path).unwrap();
                files.push((path.strip_prefix(root).unwrap().to_path_buf(), content));
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_newer_custom_styles_replaces_old_copy() {
    let old = ZipFixture::new()
        .dir("Metro for Steam/")
        .file_at("Metro for Steam/custom.styles", "v1", (2023, 6, 1, 8, 0, 0));
    let ws = workspace(&old);
    let custom = ws.skins.join(THEME).join("custom.styles");

    MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(std::fs::read_to_string(&custom).unwrap(), "v1");

    let newer = ZipFixture::new()
        .dir("Metro for Steam/")
        .file_at("Metro for Steam/custom.styles", "v2", (2024, 6, 1, 8, 0, 0));
    newer.write_to(&ws.archive).unwrap();

    let result = MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(result.skipped, 0);
    assert_eq!(std::fs::read_to_string(&custom).unwrap(), "v2");
}

#[test]
fn test_recently_edited_custom_styles_survives_new_release() {
    let fixture = ZipFixture::new()
        .dir("Metro for Steam/")
        .file_at("Metro for Steam/custom.styles", "packaged", (2024, 6, 1, 8, 0, 0));
    let ws = workspace(&fixture);

    let custom = ws.skins.join(THEME).join("custom.styles");
    std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
    std::fs::write(&custom, "mine").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&custom)
        .unwrap()
        .set_modified(SystemTime::now())
        .unwrap();

    let result = MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(result.skipped, 1);
    assert_eq!(std::fs::read_to_string(&custom).unwrap(), "mine");
}

#[test]
fn test_archive_without_theme_creates_empty_folder() {
    let ws = workspace(&ZipFixture::new().file("Something Else/file.txt", "x"));

    let result = MergePlanner::new(THEME, &ws.skins).merge(&ws.archive).unwrap();
    assert_eq!(result, ExtractionResult::default());
    assert!(ws.skins.join(THEME).is_dir());
}

#[test]
fn test_corrupt_archive_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = MergePlanner::new(THEME, temp.path()).merge(&archive).unwrap_err();
    assert!(matches!(err, MergeError::Archive(_)));
}
