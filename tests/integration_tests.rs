//! Integration tests for tidysort
//!
//! These tests simulate real-world usage scenarios, testing the complete
//! end-to-end functionality of the file organizer.
//!
//! Test categories:
//! 1. Basic organization workflows
//! 2. Collisions
//! 3. Progress reporting
//! 4. Failures and invalid input
//! 5. Configuration on disk and the CLI front end

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidysort::cli::{Cli, CliError, run_cli};
use tidysort::config::{ConfigError, Configuration, ExcludeRules, OrderedMap, load_or_create_config};
use tidysort::file_organizer::{OrganizeError, Outcome, SkipReason, organize};

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture with a source directory to organize and a fake home
/// directory that receives the category folders.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("inbox")).expect("Failed to create inbox");
        fs::create_dir(temp_dir.path().join("home")).expect("Failed to create home");
        TestFixture { temp_dir }
    }

    /// The directory being organized.
    fn inbox(&self) -> PathBuf {
        self.temp_dir.path().join("inbox")
    }

    /// Stands in for `~` in the default configuration.
    fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The default configuration with every `~` pointing at the fixture home.
    fn default_config(&self) -> Configuration {
        let home = self.home().to_string_lossy().into_owned();
        let mut config = Configuration::default();
        config.target_dirs = config
            .target_dirs
            .iter()
            .map(|(name, dir)| (name, dir.replacen('~', &home, 1)))
            .collect();
        config
    }

    /// Create a file with content in the inbox.
    fn create_file(&self, name: &str, content: &[u8]) {
        let mut file = File::create(self.inbox().join(name)).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
    }

    fn create_files(&self, names: &[&str]) {
        for name in names {
            self.create_file(name, name.as_bytes());
        }
    }

    fn assert_file_exists(&self, path: &Path) {
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, path: &Path) {
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Count regular files directly inside the inbox.
    fn count_inbox_files(&self) -> usize {
        fs::read_dir(self.inbox())
            .expect("Failed to read directory")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .count()
    }

    fn cli(&self, dry_run: bool) -> Cli {
        Cli {
            directory: Some(self.inbox()),
            config: self.root().join("config.json"),
            log_file: self.root().join("organizer.log"),
            dry_run,
            json: false,
            quiet: true,
        }
    }
}

fn small_config(targets: &[(&str, &Path)]) -> Configuration {
    Configuration {
        base_dir: String::new(),
        file_types: [
            ("Documents", vec![".pdf".to_string(), ".txt".to_string()]),
            ("Videos", vec![".mp4".to_string()]),
        ]
        .into_iter()
        .collect(),
        target_dirs: targets
            .iter()
            .map(|(name, dir)| (*name, dir.to_string_lossy().into_owned()))
            .collect::<OrderedMap<String>>(),
        exclude: ExcludeRules::default(),
    }
}

// ============================================================================
// Test Suite 1: Basic Organization
// ============================================================================

#[test]
fn test_default_configuration_example() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4", "notes"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    fixture.assert_file_exists(&fixture.home().join("Documents").join("a.pdf"));
    fixture.assert_file_exists(&fixture.home().join("Videos").join("b.mp4"));
    fixture.assert_file_exists(&fixture.inbox().join("notes"));
    fixture.assert_file_not_exists(&fixture.inbox().join("a.pdf"));

    assert_eq!(report.moved(), 2);
    assert_eq!(report.skipped(), 1);
    let notes = report
        .records
        .iter()
        .find(|r| r.file_name == "notes")
        .expect("notes should be reported");
    assert_eq!(
        notes.outcome,
        Outcome::Skipped {
            reason: SkipReason::NoMatchingCategory
        }
    );
}

#[test]
fn test_nested_destinations_are_created() {
    let fixture = TestFixture::new();
    fixture.create_files(&["scene.ma", "bundle.7z"]);

    organize(&fixture.inbox(), &fixture.default_config(), |_| {}).expect("Organize failed");

    fixture.assert_file_exists(&fixture.home().join("Documents/Maya/scene.ma"));
    fixture.assert_file_exists(&fixture.home().join("Downloads/Archives/bundle.7z"));
}

#[test]
fn test_mixed_case_extensions() {
    let fixture = TestFixture::new();
    fixture.create_files(&["REPORT.PDF", "Clip.Mp4", "photo.JPEG"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    assert_eq!(report.moved(), 3);
    fixture.assert_file_exists(&fixture.home().join("Documents/REPORT.PDF"));
    fixture.assert_file_exists(&fixture.home().join("Videos/Clip.Mp4"));
    fixture.assert_file_exists(&fixture.home().join("Pictures/photo.JPEG"));
}

#[test]
fn test_unknown_files_stay_in_place() {
    let fixture = TestFixture::new();
    fixture.create_files(&["data.xyz", "Makefile", "archive.pdf.bak"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    assert_eq!(report.skipped(), 3);
    assert_eq!(report.moved(), 0);
    assert_eq!(fixture.count_inbox_files(), 3);
    assert!(report.records.iter().all(|r| r.category.is_none()));
}

#[test]
fn test_subdirectories_are_not_traversed() {
    let fixture = TestFixture::new();
    let nested = fixture.inbox().join("projects");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("inner.pdf"), "inner").unwrap();
    fixture.create_files(&["outer.pdf"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    assert_eq!(report.total(), 1);
    fixture.assert_file_exists(&nested.join("inner.pdf"));
    fixture.assert_file_exists(&fixture.home().join("Documents/outer.pdf"));
}

#[test]
fn test_organize_preserves_file_content() {
    let fixture = TestFixture::new();
    let content = b"%PDF-1.4 quarterly numbers";
    fixture.create_file("q3.pdf", content);

    organize(&fixture.inbox(), &fixture.default_config(), |_| {}).expect("Organize failed");

    let moved = fs::read(fixture.home().join("Documents/q3.pdf")).expect("Failed to read file");
    assert_eq!(moved, content);
}

#[test]
fn test_organize_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4", "notes"]);
    let config = fixture.default_config();

    let first = organize(&fixture.inbox(), &config, |_| {}).expect("First run failed");
    assert_eq!(first.moved(), 2);

    let second = organize(&fixture.inbox(), &config, |_| {}).expect("Second run failed");
    assert_eq!(second.moved(), 0);
    assert_eq!(second.moved_with_rename(), 0);
    assert_eq!(second.total(), 1);
    fixture.assert_file_not_exists(&fixture.home().join("Documents/a_copy.pdf"));
}

#[test]
fn test_destination_inside_source_directory() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.txt"]);
    let docs = fixture.inbox().join("Documents");
    let config = small_config(&[("Documents", docs.as_path())]);

    let report = organize(&fixture.inbox(), &config, |_| {}).expect("Organize failed");
    assert_eq!(report.moved(), 2);
    fixture.assert_file_exists(&docs.join("a.pdf"));

    // The category folder is a subdirectory now and is not picked up again
    let again = organize(&fixture.inbox(), &config, |_| {}).expect("Organize failed");
    assert_eq!(again.total(), 0);
}

#[test]
fn test_exclude_rules_keep_files_out_of_the_run() {
    let fixture = TestFixture::new();
    fixture.create_files(&["movie.mp4.part", "draft.pdf", ".hidden.pdf", "final.pdf"]);
    let mut config = fixture.default_config();
    config.exclude = ExcludeRules {
        filenames: vec!["draft.pdf".to_string()],
        patterns: vec!["*.part".to_string()],
        regex: vec![],
        skip_hidden: true,
    };

    let mut calls = Vec::new();
    let report = organize(&fixture.inbox(), &config, |p| calls.push(p)).expect("Organize failed");

    assert_eq!(report.total(), 1);
    assert_eq!(calls, vec![100]);
    fixture.assert_file_exists(&fixture.home().join("Documents/final.pdf"));
    fixture.assert_file_exists(&fixture.inbox().join("draft.pdf"));
    fixture.assert_file_exists(&fixture.inbox().join(".hidden.pdf"));
    fixture.assert_file_exists(&fixture.inbox().join("movie.mp4.part"));
}

#[cfg(unix)]
#[test]
fn test_symlinked_file_is_organized() {
    let fixture = TestFixture::new();
    let real = fixture.root().join("real.pdf");
    fs::write(&real, "linked content").unwrap();
    std::os::unix::fs::symlink(&real, fixture.inbox().join("link.pdf")).unwrap();

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    assert_eq!(report.total(), 1);
    assert_eq!(report.moved(), 1);
    let moved = fixture.home().join("Documents/link.pdf");
    // The link itself is moved, its target stays put
    assert_eq!(fs::read_link(&moved).expect("Should still be a link"), real);
    assert_eq!(fs::read_to_string(&moved).unwrap(), "linked content");
    fixture.assert_file_not_exists(&fixture.inbox().join("link.pdf"));
    fixture.assert_file_exists(&real);
}

#[test]
fn test_blank_destination_leaves_file_in_place() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf"]);
    let mut config = small_config(&[]);
    config.target_dirs.insert("Documents", String::new());

    let report = organize(&fixture.inbox(), &config, |_| {}).expect("Organize failed");

    assert_eq!(
        report.records[0].outcome,
        Outcome::Skipped {
            reason: SkipReason::AlreadyInDestination
        }
    );
    fixture.assert_file_exists(&fixture.inbox().join("a.pdf"));
}

#[cfg(unix)]
#[test]
fn test_running_executable_is_never_organized() {
    let fixture = TestFixture::new();
    let exe = std::env::current_exe().expect("Failed to locate test binary");
    let exe_name = exe.file_name().expect("Test binary has a name");
    // The inbox entry resolves to the binary that is running right now
    let entry = fixture.inbox().join(exe_name);
    std::os::unix::fs::symlink(&exe, &entry).unwrap();
    fixture.create_files(&["a.pdf"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");

    // Not even reported as skipped
    assert_eq!(report.total(), 1);
    assert_eq!(report.records[0].file_name, "a.pdf");
    assert!(entry.symlink_metadata().is_ok(), "Executable entry should stay");
}

// ============================================================================
// Test Suite 2: Collisions
// ============================================================================

#[test]
fn test_second_file_with_same_name_gets_copy_suffix() {
    let fixture = TestFixture::new();
    let config = fixture.default_config();
    let docs = fixture.home().join("Documents");

    fs::write(fixture.inbox().join("report.pdf"), "first").unwrap();
    organize(&fixture.inbox(), &config, |_| {}).expect("First run failed");

    fs::write(fixture.inbox().join("report.pdf"), "second").unwrap();
    let report = organize(&fixture.inbox(), &config, |_| {}).expect("Second run failed");

    assert_eq!(report.moved_with_rename(), 1);
    assert_eq!(
        report.records[0].outcome,
        Outcome::MovedWithRename {
            destination: docs.join("report_copy.pdf")
        }
    );
    assert_eq!(fs::read_to_string(docs.join("report.pdf")).unwrap(), "first");
    assert_eq!(fs::read_to_string(docs.join("report_copy.pdf")).unwrap(), "second");
}

#[test]
fn test_repeated_collisions_never_overwrite() {
    let fixture = TestFixture::new();
    let config = fixture.default_config();
    let docs = fixture.home().join("Documents");

    for round in 0..4 {
        fs::write(fixture.inbox().join("scan.pdf"), format!("round {}", round)).unwrap();
        organize(&fixture.inbox(), &config, |_| {}).expect("Organize failed");
    }

    assert_eq!(fs::read_to_string(docs.join("scan.pdf")).unwrap(), "round 0");
    assert_eq!(fs::read_to_string(docs.join("scan_copy.pdf")).unwrap(), "round 1");
    assert_eq!(fs::read_to_string(docs.join("scan_copy_2.pdf")).unwrap(), "round 2");
    assert_eq!(fs::read_to_string(docs.join("scan_copy_3.pdf")).unwrap(), "round 3");
}

#[test]
fn test_collision_keeps_multi_dot_prefix() {
    let fixture = TestFixture::new();
    let archives = fixture.home().join("Downloads/Archives");
    fs::create_dir_all(&archives).unwrap();
    fs::write(archives.join("backup.tar.gz"), "old").unwrap();
    fixture.create_files(&["backup.tar.gz"]);

    organize(&fixture.inbox(), &fixture.default_config(), |_| {}).expect("Organize failed");

    fixture.assert_file_exists(&archives.join("backup.tar_copy.gz"));
}

// ============================================================================
// Test Suite 3: Progress Reporting
// ============================================================================

#[test]
fn test_progress_called_once_per_file() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4", "notes"]);

    let mut calls = Vec::new();
    organize(&fixture.inbox(), &fixture.default_config(), |p| calls.push(p))
        .expect("Organize failed");

    assert_eq!(calls, vec![33, 67, 100]);
}

#[test]
fn test_progress_is_non_decreasing_and_ends_at_100() {
    let fixture = TestFixture::new();
    for i in 0..17 {
        fixture.create_file(&format!("file_{:02}.txt", i), b"text");
    }

    let mut calls: Vec<u8> = Vec::new();
    organize(&fixture.inbox(), &fixture.default_config(), |p| calls.push(p))
        .expect("Organize failed");

    assert_eq!(calls.len(), 17);
    assert!(calls.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(calls.last(), Some(&100));
}

#[test]
fn test_no_progress_for_empty_directory() {
    let fixture = TestFixture::new();
    fs::create_dir(fixture.inbox().join("only_a_subdir")).unwrap();

    let mut calls = 0;
    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| calls += 1)
        .expect("Organize failed");

    assert_eq!(calls, 0);
    assert_eq!(report.total(), 0);
    assert_eq!(report.progress(), 100);
}

// ============================================================================
// Test Suite 4: Failures and Invalid Input
// ============================================================================

#[test]
fn test_failed_move_does_not_stop_the_run() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4", "c.txt"]);

    // A regular file where the Documents directory should be created
    let blocker = fixture.root().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let videos = fixture.root().join("videos");
    let docs = blocker.join("docs");
    let config = small_config(&[("Documents", docs.as_path()), ("Videos", videos.as_path())]);

    let mut calls = Vec::new();
    let report = organize(&fixture.inbox(), &config, |p| calls.push(p)).expect("Organize failed");

    assert_eq!(report.failed(), 2);
    assert_eq!(report.moved(), 1);
    assert!(!report.is_success());
    assert_eq!(calls, vec![33, 67, 100]);
    fixture.assert_file_exists(&videos.join("b.mp4"));
    fixture.assert_file_exists(&fixture.inbox().join("a.pdf"));
    fixture.assert_file_exists(&fixture.inbox().join("c.txt"));

    let failure = &report.records[0];
    assert_eq!(failure.file_name, "a.pdf");
    assert!(matches!(failure.outcome, Outcome::Failed { .. }));
}

#[test]
fn test_missing_directory_is_rejected_before_progress() {
    let fixture = TestFixture::new();
    let missing = fixture.root().join("does_not_exist");

    let mut calls = 0;
    let result = organize(&missing, &fixture.default_config(), |_| calls += 1);

    assert!(matches!(result, Err(OrganizeError::InvalidDirectory { .. })));
    assert_eq!(calls, 0);
}

#[test]
fn test_report_serializes_outcomes() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "notes"]);

    let report = organize(&fixture.inbox(), &fixture.default_config(), |_| {})
        .expect("Organize failed");
    let json = serde_json::to_value(&report).expect("Failed to serialize report");

    assert_eq!(json["records"][0]["outcome"]["outcome"], "moved");
    assert_eq!(json["records"][1]["outcome"]["outcome"], "skipped");
    assert_eq!(json["records"][1]["outcome"]["reason"], "no_matching_category");
    assert_eq!(json["summary"]["moved"], 1);
    assert_eq!(json["summary"]["skipped"], 1);
    assert_eq!(json["summary"]["failed"], 0);
    assert_eq!(json["summary"]["total"], 2);
}

// ============================================================================
// Test Suite 5: Configuration on Disk and the CLI
// ============================================================================

#[test]
fn test_config_file_drives_organization() {
    let fixture = TestFixture::new();
    let config_path = fixture.root().join("config.json");
    let target = fixture.root().join("papers");
    fs::write(
        &config_path,
        format!(
            r#"{{
    "base_dir": "{inbox}",
    "file_types": {{ "Papers": ["PDF"] }},
    "target_dirs": {{ "Papers": "{target}" }}
}}"#,
            inbox = fixture.inbox().display(),
            target = target.display()
        ),
    )
    .unwrap();
    fixture.create_files(&["thesis.pdf", "clip.mp4"]);

    let config = load_or_create_config(&config_path).expect("Failed to load config");
    let report = organize(&fixture.inbox(), &config, |_| {}).expect("Organize failed");

    assert_eq!(report.moved(), 1);
    fixture.assert_file_exists(&target.join("thesis.pdf"));
    fixture.assert_file_exists(&fixture.inbox().join("clip.mp4"));
}

#[test]
fn test_cli_dry_run_moves_nothing() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4"]);
    let cli = fixture.cli(true);
    fixture.default_config().save(&cli.config).unwrap();

    run_cli(&cli).expect("Dry run failed");

    assert_eq!(fixture.count_inbox_files(), 2);
    fixture.assert_file_not_exists(&fixture.home().join("Documents"));
}

#[test]
fn test_cli_organizes_directory() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf", "b.mp4"]);
    let cli = fixture.cli(false);
    fixture.default_config().save(&cli.config).unwrap();

    run_cli(&cli).expect("Organize failed");

    assert_eq!(fixture.count_inbox_files(), 0);
    fixture.assert_file_exists(&fixture.home().join("Documents/a.pdf"));
}

#[test]
fn test_cli_reports_failed_files() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf"]);
    let blocker = fixture.root().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let cli = fixture.cli(false);
    small_config(&[("Documents", blocker.as_path())]).save(&cli.config).unwrap();

    let result = run_cli(&cli);

    assert!(matches!(
        result,
        Err(CliError::IncompleteRun {
            failed: 1,
            total: 1
        })
    ));
}

#[test]
fn test_cli_rejects_malformed_config() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf"]);
    let cli = fixture.cli(false);
    fs::write(&cli.config, "not json").unwrap();

    let result = run_cli(&cli);

    assert!(matches!(result, Err(CliError::Config(_))));
    fixture.assert_file_exists(&fixture.inbox().join("a.pdf"));
}

#[test]
fn test_cli_rejects_unreadable_config() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.pdf"]);
    let cli = fixture.cli(false);
    fs::create_dir(&cli.config).unwrap();

    let result = run_cli(&cli);

    assert!(matches!(result, Err(CliError::Config(ConfigError::Read { .. }))));
    fixture.assert_file_exists(&fixture.inbox().join("a.pdf"));
}
