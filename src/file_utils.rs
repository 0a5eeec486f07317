use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: Resource file discovery and directory utilities

/// Which base resource files a run covers
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Base file stems to keep (empty keeps all), compared case-insensitively
    pub pages: Vec<String>,
    /// Directory name skipped anywhere in a path (empty disables)
    pub excluded_dir: String,
    /// Language codes whose `*.<lang>.resx` files are translations, not bases
    pub languages: Vec<String>,
}

impl ResourceFilter {
    // @checks: Base file passes page, exclusion and localisation filters
    pub fn accepts(&self, path: &Path) -> bool {
        if !self.excluded_dir.trim().is_empty()
            && path
                .components()
                .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case(&self.excluded_dir))
        {
            return false;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if self
            .languages
            .iter()
            .any(|lang| file_name.ends_with(&format!(".{}.resx", lang.to_lowercase())))
        {
            return false;
        }

        if self.pages.is_empty() {
            return true;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.pages.iter().any(|page| page.eq_ignore_ascii_case(&stem))
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Resolve `-d` names to sub-directories of the resources root
    ///
    /// Names match case-insensitively; unknown names are warned about and
    /// skipped. When nothing matches, the whole root is used.
    pub fn resolve_working_dirs<P: AsRef<Path>>(resources_dir: P, names: &[String]) -> Vec<PathBuf> {
        let root = resources_dir.as_ref();
        if names.is_empty() {
            return vec![root.to_path_buf()];
        }

        let subdirs: Vec<PathBuf> = fs::read_dir(root)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default();

        let mut selected = Vec::new();
        for name in names {
            let found = subdirs.iter().find(|dir| {
                dir.file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(name))
            });
            match found {
                Some(dir) => {
                    info!("📂 Using subdirectory: {}", name);
                    selected.push(dir.clone());
                }
                None => warn!("⚠ Subdirectory '{}' not found. Skipping.", name),
            }
        }

        if selected.is_empty() {
            selected.push(root.to_path_buf());
        }
        selected
    }

    /// Find base .resx files under the given directories, sorted and de-duplicated
    pub fn find_base_resources(dirs: &[PathBuf], filter: &ResourceFilter) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for dir in dirs {
            for entry in WalkDir::new(dir).follow_links(true) {
                let entry = entry.context("Failed to read directory entry")?;
                let path = entry.path();

                let is_resx = path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("resx"));
                if path.is_file() && is_resx && filter.accepts(path) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        result.dedup();
        Ok(result)
    }
}
