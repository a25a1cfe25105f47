//! Descriptor patching for a catalog entry.
//!
//! An entry lives in `<repo>/<app-id>/` and carries two descriptors: the
//! compose file, whose `image:` lines are pinned to the release, and the
//! manifest, whose `version:` and `releaseNotes:` fields are updated.
//! Patching is line based: every byte outside the rewritten fields is kept,
//! including comments, key order and line endings, and running it twice
//! gives the same bytes as running it once.

mod compose;
mod lines;
mod manifest;
mod template;

use crate::ReleaseTarget;
use crate::cli::RuntimeConfig;
use crate::error::DescriptorError;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

/// Compose descriptor file name
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Manifest descriptor file name
pub const MANIFEST_FILE: &str = "umbrel-app.yml";

/// One rewritten (or removed) line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    /// 1-based line number in the original file
    pub line: usize,
    /// Original content, without terminator
    pub before: String,
    /// New content; `None` when the line was removed
    pub after: Option<String>,
}

impl fmt::Display for LineChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.after {
            Some(after) => write!(f, "L{}: {} -> {}", self.line, self.before.trim(), after.trim()),
            None => write!(f, "L{}: removed {}", self.line, self.before.trim()),
        }
    }
}

/// Changes to one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Descriptor path inside the entry directory
    pub path: PathBuf,
    /// Changed lines, in file order
    pub changes: Vec<LineChange>,
}

impl FileChange {
    /// Whether the descriptor content changed
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// What a patch did (or, in a dry run, would do)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Entry directory, `<repo>/<app-id>`
    pub entry_dir: PathBuf,
    /// Files copied from the template because the entry was new
    pub seeded: Vec<PathBuf>,
    /// Compose then manifest
    pub files: Vec<FileChange>,
}

impl PatchReport {
    /// Whether the entry differs from what was on disk before the patch
    pub fn has_changes(&self) -> bool {
        !self.seeded.is_empty() || self.files.iter().any(FileChange::is_changed)
    }
}

/// Patches the descriptors of one catalog entry
pub struct DescriptorPatcher<'a> {
    app_id: &'a str,
    image: &'a str,
    template_dir: &'a Path,
    runtime: &'a RuntimeConfig,
}

impl<'a> DescriptorPatcher<'a> {
    /// Create a patcher for `app_id`, pinning `image`
    pub fn new(
        app_id: &'a str,
        image: &'a str,
        template_dir: &'a Path,
        runtime: &'a RuntimeConfig,
    ) -> Self {
        Self {
            app_id,
            image,
            template_dir,
            runtime,
        }
    }

    /// Entry directory inside `repo_path`
    pub fn entry_dir(&self, repo_path: &Path) -> PathBuf {
        repo_path.join(self.app_id)
    }

    /// Release notes line for `target` on `date`
    pub fn release_notes(target: &ReleaseTarget, date: NaiveDate) -> String {
        format!("Update to {} ({})", target.version, date.format("%Y-%m-%d"))
    }

    /// Point the entry's descriptors at `target`.
    ///
    /// A missing entry is seeded from the template first. In a dry run
    /// nothing is written or seeded, but the report lists the same changes
    /// a real run would make.
    pub fn patch(
        &self,
        repo_path: &Path,
        target: &ReleaseTarget,
        date: NaiveDate,
        dry_run: bool,
    ) -> Result<PatchReport, DescriptorError> {
        let entry_dir = self.entry_dir(repo_path);

        let (source_dir, seeded) = if entry_dir.is_dir() {
            (entry_dir.clone(), Vec::new())
        } else if dry_run {
            let files = template::template_files(self.template_dir)?;
            self.runtime.println(&format!(
                "[dry-run] would seed {} from {}",
                entry_dir.display(),
                self.template_dir.display()
            ));
            (self.template_dir.to_path_buf(), files)
        } else {
            self.runtime.progress(&format!(
                "New entry, seeding {} from {}",
                entry_dir.display(),
                self.template_dir.display()
            ));
            let files = template::seed(self.template_dir, &entry_dir)?;
            (entry_dir.clone(), files)
        };

        let image_ref = target.image_ref(self.image);
        let compose = self.patch_file(&source_dir, &entry_dir, COMPOSE_FILE, dry_run, |content| {
            compose::rewrite(content, self.image, &image_ref).ok_or("image")
        })?;

        let notes = Self::release_notes(target, date);
        let notes_prefix = format!("Update to {} (", target.version);
        let manifest = self.patch_file(&source_dir, &entry_dir, MANIFEST_FILE, dry_run, |content| {
            manifest::rewrite(content, target.version_number(), &notes, &notes_prefix)
                .map_err(|missing| missing.0)
        })?;

        let report = PatchReport {
            entry_dir,
            seeded,
            files: vec![compose, manifest],
        };
        self.print_report(&report, dry_run);
        Ok(report)
    }

    /// Read `name` from `source_dir`, rewrite it, and write it to `entry_dir`
    /// unless nothing changed or this is a dry run
    fn patch_file<F>(
        &self,
        source_dir: &Path,
        entry_dir: &Path,
        name: &str,
        dry_run: bool,
        rewrite: F,
    ) -> Result<FileChange, DescriptorError>
    where
        F: FnOnce(&str) -> Result<(String, Vec<LineChange>), &'static str>,
    {
        let source = source_dir.join(name);
        let path = entry_dir.join(name);
        if !source.is_file() {
            return Err(DescriptorError::Missing { path });
        }

        let content = std::fs::read_to_string(&source).map_err(|e| DescriptorError::Io {
            path: source.clone(),
            source: e,
        })?;
        let (updated, changes) = rewrite(&content).map_err(|field| DescriptorError::FieldNotFound {
            path: path.clone(),
            field: field.to_string(),
        })?;

        if !dry_run && updated != content {
            std::fs::write(&path, updated).map_err(|e| DescriptorError::Io {
                path: path.clone(),
                source: e,
            })?;
        }

        Ok(FileChange { path, changes })
    }

    fn print_report(&self, report: &PatchReport, dry_run: bool) {
        let prefix = if dry_run { "[dry-run] would update" } else { "Updated" };
        for file in &report.files {
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if file.is_changed() {
                self.runtime.println(&format!(
                    "{prefix} {name} ({} line(s))",
                    file.changes.len()
                ));
                for change in &file.changes {
                    self.runtime.verbose_indent(&change.to_string());
                }
            } else {
                self.runtime.verbose_println(&format!("{name} already up to date"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentDigest;

    const COMPOSE: &str = "version: \"3.7\"\n\nservices:\n  app_proxy:\n    environment:\n      APP_HOST: myapp_web_1\n      APP_PORT: 3000\n\n  web:\n    image: ghcr.io/x/y:v2026.1.0@sha256:0ld # app\n    restart: on-failure\n";
    const MANIFEST: &str = "manifestVersion: 1\nid: myapp\nname: My App\nversion: \"2026.1.0\"\nreleaseNotes: \"Initial\"\nport: 3000\n";

    fn target() -> ReleaseTarget {
        ReleaseTarget::new(
            "v2026.1.24",
            ContentDigest::parse("sha256:deadbeef").unwrap(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()
    }

    fn write_entry(repo: &Path) {
        let entry = repo.join("myapp");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(COMPOSE_FILE), COMPOSE).unwrap();
        std::fs::write(entry.join(MANIFEST_FILE), MANIFEST).unwrap();
    }

    #[test]
    fn test_patch_rewrites_only_named_fields() {
        let tmp = tempfile::tempdir().unwrap();
        write_entry(tmp.path());
        let runtime = RuntimeConfig::quiet();
        let template = tmp.path().join("template");
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);

        let report = patcher.patch(tmp.path(), &target(), date(), false).unwrap();
        assert!(report.has_changes());
        assert!(report.seeded.is_empty());

        let compose = std::fs::read_to_string(tmp.path().join("myapp").join(COMPOSE_FILE)).unwrap();
        assert_eq!(
            compose,
            COMPOSE.replace(
                "ghcr.io/x/y:v2026.1.0@sha256:0ld",
                "ghcr.io/x/y:v2026.1.24@sha256:deadbeef"
            )
        );
        let manifest = std::fs::read_to_string(tmp.path().join("myapp").join(MANIFEST_FILE)).unwrap();
        assert_eq!(
            manifest,
            "manifestVersion: 1\nid: myapp\nname: My App\nversion: \"2026.1.24\"\nreleaseNotes: \"Update to v2026.1.24 (2026-01-24)\"\nport: 3000\n"
        );
    }

    #[test]
    fn test_second_patch_is_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        write_entry(tmp.path());
        let runtime = RuntimeConfig::quiet();
        let template = tmp.path().join("template");
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);

        patcher.patch(tmp.path(), &target(), date(), false).unwrap();
        let first = std::fs::read(tmp.path().join("myapp").join(MANIFEST_FILE)).unwrap();
        let later = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let report = patcher.patch(tmp.path(), &target(), later, false).unwrap();
        let second = std::fs::read(tmp.path().join("myapp").join(MANIFEST_FILE)).unwrap();

        assert_eq!(first, second);
        assert!(!report.has_changes());
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        write_entry(tmp.path());
        let runtime = RuntimeConfig::quiet();
        let template = tmp.path().join("template");
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);

        let dry = patcher.patch(tmp.path(), &target(), date(), true).unwrap();
        let compose = std::fs::read_to_string(tmp.path().join("myapp").join(COMPOSE_FILE)).unwrap();
        assert_eq!(compose, COMPOSE);

        let real = patcher.patch(tmp.path(), &target(), date(), false).unwrap();
        assert_eq!(dry, real);
    }

    #[test]
    fn test_missing_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("myapp");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(MANIFEST_FILE), MANIFEST).unwrap();
        let runtime = RuntimeConfig::quiet();
        let template = tmp.path().join("template");
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);

        let err = patcher.patch(tmp.path(), &target(), date(), false).unwrap_err();
        assert!(matches!(err, DescriptorError::Missing { path } if path.ends_with(COMPOSE_FILE)));
    }

    #[test]
    fn test_new_entry_seeded_from_template() {
        let tmp = tempfile::tempdir().unwrap();
        let template = tmp.path().join("template");
        std::fs::create_dir_all(&template).unwrap();
        std::fs::write(template.join(COMPOSE_FILE), COMPOSE).unwrap();
        std::fs::write(template.join(MANIFEST_FILE), MANIFEST).unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let runtime = RuntimeConfig::quiet();
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);

        let dry = patcher.patch(&repo, &target(), date(), true).unwrap();
        assert!(!repo.join("myapp").exists());
        assert_eq!(dry.seeded.len(), 2);

        let real = patcher.patch(&repo, &target(), date(), false).unwrap();
        assert_eq!(dry, real);
        assert!(repo.join("myapp").join(COMPOSE_FILE).is_file());
        // template itself untouched
        assert_eq!(std::fs::read_to_string(template.join(MANIFEST_FILE)).unwrap(), MANIFEST);
    }

    #[test]
    fn test_missing_template_for_new_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let runtime = RuntimeConfig::quiet();
        let template = tmp.path().join("template");
        let patcher = DescriptorPatcher::new("myapp", "ghcr.io/x/y", &template, &runtime);
        for dry_run in [true, false] {
            let err = patcher.patch(tmp.path(), &target(), date(), dry_run).unwrap_err();
            assert!(matches!(err, DescriptorError::TemplateMissing { .. }));
        }
    }
}
