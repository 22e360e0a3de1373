//! Input selection: expand user-supplied paths into a sorted file list.
//!
//! Directories are walked recursively, mirroring a whole-folder upload.
//! Each file is classified by extension; anything that is not a PDF or a
//! JPEG/PNG/WEBP image is reported and left out. A selection with no
//! supported file at all is rejected before any batch state is touched.

use crate::error::SelectionError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Accepted input media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
    Webp,
}

impl MediaType {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MediaType::Pdf),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "webp" => Some(MediaType::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, MediaType::Pdf)
    }
}

/// One selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Final path component, used for ordering and in error summaries.
    pub filename: String,
    pub media_type: MediaType,
}

impl SourceFile {
    /// Returns `None` when the extension is not an accepted type.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let media_type = MediaType::from_path(&path)?;
        let filename = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            path,
            filename,
            media_type,
        })
    }

    /// The filename with its last extension removed.
    ///
    /// `"Receipt 03.pdf"` → `"Receipt 03"`, `"a.b.png"` → `"a.b"`.
    pub fn display_name(&self) -> String {
        strip_extension(&self.filename).to_string()
    }
}

fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() => &filename[..idx],
        _ => filename,
    }
}

/// Files accepted for a batch plus those that were left out.
#[derive(Debug, Default)]
pub struct Selection {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<PathBuf>,
}

/// Expand files and directories into a [`Selection`].
///
/// Returns [`SelectionError::NoSupportedFiles`] when nothing usable remains.
pub fn collect_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Selection, SelectionError> {
    let mut selection = Selection::default();

    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(SelectionError::NotFound {
                path: path.to_path_buf(),
            });
        }

        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| SelectionError::Walk {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })?;
                if entry.file_type().is_file() {
                    classify(entry.into_path(), &mut selection);
                }
            }
        } else {
            classify(path.to_path_buf(), &mut selection);
        }
    }

    if selection.files.is_empty() {
        return Err(SelectionError::NoSupportedFiles {
            skipped: selection.skipped.len(),
        });
    }

    debug!(
        "Selected {} file(s), skipped {}",
        selection.files.len(),
        selection.skipped.len()
    );
    Ok(selection)
}

fn classify(path: PathBuf, selection: &mut Selection) {
    match SourceFile::from_path(path.clone()) {
        Some(file) => selection.files.push(file),
        None => {
            warn!("Skipping unsupported file: {}", path.display());
            selection.skipped.push(path);
        }
    }
}

/// Order used for processing: case-insensitive by filename, lowercase
/// before uppercase when names differ only in case.
pub fn compare_filenames(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Sort files into processing order. Stable, so equal names keep input order.
pub fn sort_for_processing(files: &mut [SourceFile]) {
    files.sort_by(|a, b| compare_filenames(&a.filename, &b.filename));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.filename.as_str()).collect()
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(MediaType::from_path(Path::new("a.PDF")), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_path(Path::new("a.jpeg")), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_path(Path::new("a.JPG")), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_path(Path::new("a.webp")), Some(MediaType::Webp));
        assert_eq!(MediaType::from_path(Path::new("a.gif")), None);
        assert_eq!(MediaType::from_path(Path::new("README")), None);
    }

    #[test]
    fn display_name_strips_last_extension() {
        let f = SourceFile::from_path("/tmp/Receipt 03.pdf").unwrap();
        assert_eq!(f.display_name(), "Receipt 03");
        let f = SourceFile::from_path("dir/a.b.png").unwrap();
        assert_eq!(f.display_name(), "a.b");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("trailing."), "trailing.");
    }

    #[test]
    fn sorts_by_filename() {
        let mut files: Vec<SourceFile> = ["b.pdf", "a.jpg", "c.png"]
            .iter()
            .map(|n| SourceFile::from_path(*n).unwrap())
            .collect();
        sort_for_processing(&mut files);
        assert_eq!(names(&files), ["a.jpg", "b.pdf", "c.png"]);
    }

    #[test]
    fn sort_ignores_directories_and_case() {
        let mut files: Vec<SourceFile> = ["z/Beta.pdf", "a/gamma.png", "m/alpha.jpg"]
            .iter()
            .map(|n| SourceFile::from_path(*n).unwrap())
            .collect();
        sort_for_processing(&mut files);
        assert_eq!(names(&files), ["alpha.jpg", "Beta.pdf", "gamma.png"]);
    }

    #[test]
    fn lowercase_before_uppercase_on_tie() {
        assert_eq!(compare_filenames("a.pdf", "A.pdf"), Ordering::Less);
        assert_eq!(compare_filenames("A.pdf", "a.pdf"), Ordering::Greater);
        assert_eq!(compare_filenames("a.pdf", "a.pdf"), Ordering::Equal);
    }

    #[test]
    fn collect_walks_directories_and_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("one.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(nested.join("two.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let selection = collect_inputs(&[dir.path()]).unwrap();
        let mut found: Vec<&str> = names(&selection.files);
        found.sort();
        assert_eq!(found, ["one.pdf", "two.png"]);
        assert_eq!(selection.skipped.len(), 1);
    }

    #[test]
    fn collect_rejects_selection_without_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"hello").unwrap();

        let err = collect_inputs(&[&txt]).unwrap_err();
        assert!(matches!(err, SelectionError::NoSupportedFiles { skipped: 1 }));
    }

    #[test]
    fn collect_reports_missing_path() {
        let err = collect_inputs(&["/definitely/not/here.pdf"]).unwrap_err();
        assert!(matches!(err, SelectionError::NotFound { .. }));
    }
}
