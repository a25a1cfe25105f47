//! First-time onboarding: copy the template directory into the catalog.

use crate::error::DescriptorError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DescriptorError + '_ {
    move |source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Relative paths of the regular files below `template`, sorted
pub(crate) fn template_files(template: &Path) -> Result<Vec<PathBuf>, DescriptorError> {
    if !template.is_dir() {
        return Err(DescriptorError::TemplateMissing {
            path: template.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(template).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(template).to_path_buf();
            DescriptorError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file()
            && let Ok(relative) = entry.path().strip_prefix(template)
        {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Recursively copy `template` to `dest`, returning the copied relative paths
pub(crate) fn seed(template: &Path, dest: &Path) -> Result<Vec<PathBuf>, DescriptorError> {
    let files = template_files(template)?;
    std::fs::create_dir_all(dest).map_err(io_error(dest))?;

    for relative in &files {
        let from = template.join(relative);
        let to = dest.join(relative);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        std::fs::copy(&from, &to).map_err(io_error(&to))?;
    }

    log::info!(
        "Seeded {} from {} ({} files)",
        dest.display(),
        template.display(),
        files.len()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_copies_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let template = tmp.path().join("umbrel-app");
        std::fs::create_dir_all(template.join("assets")).unwrap();
        std::fs::write(template.join("umbrel-app.yml"), "version: \"0\"\n").unwrap();
        std::fs::write(template.join("assets/icon.svg"), "<svg/>").unwrap();

        let dest = tmp.path().join("repo/myapp");
        let files = seed(&template, &dest).unwrap();

        assert_eq!(
            files,
            vec![PathBuf::from("assets/icon.svg"), PathBuf::from("umbrel-app.yml")]
        );
        assert_eq!(
            std::fs::read_to_string(dest.join("assets/icon.svg")).unwrap(),
            "<svg/>"
        );
    }

    #[test]
    fn test_missing_template() {
        let tmp = tempfile::tempdir().unwrap();
        let err = seed(&tmp.path().join("nope"), &tmp.path().join("dest")).unwrap_err();
        assert!(matches!(err, DescriptorError::TemplateMissing { .. }));
        assert!(!tmp.path().join("dest").exists());
    }
}
