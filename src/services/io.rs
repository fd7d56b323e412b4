//! File I/O for the upload and download ends of the flow
//!
//! This module keeps file system access out of the controller's
//! transitions: selections read their bytes lazily, and downloads are
//! written here.

use crate::{
    error::{BgRemovalError, Result},
    types::{Download, ImageDataUri},
};
use image::ImageFormat;
use std::fmt;
use std::path::{Path, PathBuf};

/// Content type declared for files whose extension is not a known image format
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Where the bytes of a selected file live
#[derive(Clone)]
pub enum FileSource {
    /// Bytes already in memory (drag-and-drop, tests, embedding hosts)
    Memory(Vec<u8>),
    /// File on disk, read on demand
    Path(PathBuf),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
        }
    }
}

/// A file picked by the user, with the content type it claims to have
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    source: FileSource,
}

impl SelectedFile {
    /// Select a file on disk; the content type is inferred from its extension
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_client::services::SelectedFile;
    ///
    /// let file = SelectedFile::from_path("holiday/photo.jpg");
    /// assert_eq!(file.name(), "photo.jpg");
    /// assert_eq!(file.content_type(), "image/jpeg");
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            content_type: content_type_for_path(path).to_string(),
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    /// Select in-memory bytes under an explicit name and content type
    pub fn from_bytes<N, C>(name: N, content_type: C, bytes: Vec<u8>) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Memory(bytes),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// True when the declared content type is an image type
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Read the file's bytes
    ///
    /// # Errors
    /// File system errors for path-backed selections
    pub fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => std::fs::read(path)
                .map_err(|e| BgRemovalError::file_io_error("read selected file", path, &e)),
        }
    }

    /// Read and encode the file as a data URI under its declared content type
    ///
    /// # Errors
    /// - File system errors
    /// - Empty files or malformed content types
    pub fn encode(&self) -> Result<ImageDataUri> {
        let bytes = self.read()?;
        ImageDataUri::from_bytes(&self.content_type, &bytes)
    }
}

/// Content type a browser would declare for this path, judged by extension
#[must_use]
pub fn content_type_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path).map_or(UNKNOWN_CONTENT_TYPE, |format| format.to_mime_type())
}

/// Write a download into `dir`, creating the directory if needed
///
/// # Returns
/// Path of the written file
///
/// # Errors
/// File system errors while creating the directory or writing the file
pub fn save_download<P: AsRef<Path>>(download: &Download, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .map_err(|e| BgRemovalError::file_io_error("create download directory", dir, &e))?;

    let path = dir.join(&download.file_name);
    std::fs::write(&path, &download.bytes)
        .map_err(|e| BgRemovalError::file_io_error("write download", &path, &e))?;

    log::info!("Saved {} ({} bytes)", path.display(), download.bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for_path(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type_for_path(Path::new("notes.txt")), UNKNOWN_CONTENT_TYPE);
        assert_eq!(content_type_for_path(Path::new("no_extension")), UNKNOWN_CONTENT_TYPE);
    }

    #[test]
    fn test_path_selection_reads_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("later.png");

        // Selecting does not touch the file system.
        let file = SelectedFile::from_path(&path);
        assert!(file.is_image());
        assert!(file.read().is_err());

        std::fs::write(&path, b"png-bytes").unwrap();
        let encoded = file.encode().unwrap();
        assert_eq!(encoded.mime_type(), "image/png");
        assert_eq!(encoded.decode().unwrap(), b"png-bytes");
    }

    #[test]
    fn test_memory_selection() {
        let file = SelectedFile::from_bytes("doc.pdf", "application/pdf", vec![1, 2, 3]);
        assert!(!file.is_image());
        assert_eq!(file.read().unwrap(), vec![1, 2, 3]);
        assert!(format!("{file:?}").contains("3 bytes"));
    }

    #[test]
    fn test_save_download_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("out");
        let download = Download {
            file_name: "photo_nobg.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"result".to_vec(),
        };

        let path = save_download(&download, &target).unwrap();
        assert_eq!(path, target.join("photo_nobg.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"result");
    }
}
