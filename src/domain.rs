mod viewer;

pub use viewer::{Direction, Viewer, ViewerState};

use crate::error::{Result, ShortlistError};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Image formats the viewer knows how to triage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &["jpg", "jpeg"],
            ImageFormat::Png => &["png"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
        }
    }

    /// Codec used to decode files of this format
    pub fn codec(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }

    /// Whether the linked `image` build can actually read this format
    pub fn is_decodable(&self) -> bool {
        self.codec().reading_enabled()
    }
}

/// Extension lookup over the formats that passed the decoder capability check.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<ImageFormat>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::with_formats(ImageFormat::ALL)
    }

    /// Builds a registry limited to `formats`; formats without a decoder are left out.
    pub fn with_formats(formats: impl IntoIterator<Item = ImageFormat>) -> Self {
        let mut registered = Vec::new();
        for format in formats {
            if !format.is_decodable() {
                tracing::warn!("{} decoding unavailable, not registering it", format.label());
                continue;
            }
            if !registered.contains(&format) {
                registered.push(format);
            }
        }
        Self {
            formats: registered,
        }
    }

    pub fn formats(&self) -> &[ImageFormat] {
        &self.formats
    }

    /// Case-insensitive extension lookup, without the leading dot
    pub fn lookup(&self, ext: &str) -> Option<ImageFormat> {
        let ext = ext.to_lowercase();
        self.formats
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    pub fn for_path(&self, path: &Path) -> Option<ImageFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.lookup(ext))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified_date: DateTime<Utc>,
    pub format: ImageFormat,
}

impl ImageEntry {
    pub fn from_path(path: &Path, format: ImageFormat) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let modified_date: DateTime<Utc> = modified.into();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ImageEntry {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            modified_date,
            format,
        })
    }
}

/// Options for the image scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip dot-files and anything below a dot-directory
    pub skip_hidden: bool,
    pub registry: FormatRegistry,
}

/// Recursively collects the images below `root`.
///
/// The result is sorted by full path and holds each file once, so two scans of
/// an unmodified tree return the same sequence. Entries that cannot be read are
/// skipped and logged.
pub fn scan_images(root: &Path, options: &ScanOptions) -> Result<Vec<ImageEntry>> {
    let metadata = fs::metadata(root)
        .map_err(|e| ShortlistError::scan(root, format!("directory does not exist ({})", e)))?;
    if !metadata.is_dir() {
        return Err(ShortlistError::scan(root, "not a directory"));
    }

    let mut images = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !(options.skip_hidden && e.depth() > 0 && is_hidden(e)));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(format) = options.registry.for_path(entry.path()) else {
            continue;
        };

        match ImageEntry::from_path(entry.path(), format) {
            Ok(image) => images.push(image),
            Err(e) => tracing::warn!("skipping {}: {}", entry.path().display(), e),
        }
    }

    images.sort_by(|a, b| a.path.cmp(&b.path));
    images.dedup_by(|a, b| a.path == b.path);

    tracing::info!("scanned {}: {} images", root.display(), images.len());
    Ok(images)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
