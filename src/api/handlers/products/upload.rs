//! Multipart file intake for product images and installers.
//!
//! Files land under `<root>/resources`, `<root>/windows` or `<root>/macos`
//! as `<ulid>-<sanitized name>`, so every upload owns its path. The stored
//! path is what the product record points at.

use anyhow::Context;
use axum::extract::multipart::Field;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::api::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    WindowsInstaller,
    MacosInstaller,
}

impl AssetKind {
    pub const ALL: [Self; 3] = [Self::Image, Self::WindowsInstaller, Self::MacosInstaller];

    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Image => "resources",
            Self::WindowsInstaller => "windows",
            Self::MacosInstaller => "macos",
        }
    }

    /// Images are filtered by mimetype, installers by extension.
    #[must_use]
    pub fn accepts(self, file_name: &str, content_type: Option<&str>) -> bool {
        match self {
            Self::Image => matches!(content_type, Some("image/jpeg" | "image/png")),
            Self::WindowsInstaller => has_extension(file_name, "exe"),
            Self::MacosInstaller => has_extension(file_name, "dmg"),
        }
    }
}

fn has_extension(file_name: &str, expected: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

/// Last path component of a client-supplied name, without control characters.
pub(crate) fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned)
}

#[derive(Clone, Debug)]
pub struct Uploads {
    root: PathBuf,
}

impl Uploads {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directories.
    ///
    /// # Errors
    /// Fails when a directory cannot be created.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        for kind in AssetKind::ALL {
            let dir = self.root.join(kind.directory());
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        }
        Ok(())
    }

    fn fresh_path(&self, kind: AssetKind, file_name: &str) -> PathBuf {
        self.root
            .join(kind.directory())
            .join(format!("{}-{file_name}", Ulid::new()))
    }

    /// Stream `field` to disk. Returns `Ok(None)` when the file is not
    /// acceptable for `kind`; nothing is written in that case.
    ///
    /// # Errors
    /// `BadRequest` when the multipart stream breaks, `Internal` on I/O faults.
    pub async fn save(&self, kind: AssetKind, mut field: Field<'_>) -> Result<Option<String>, ApiError> {
        let Some(file_name) = field.file_name().and_then(sanitize_file_name) else {
            debug!(?kind, "Upload skipped: missing file name");
            return Ok(None);
        };
        if !kind.accepts(&file_name, field.content_type()) {
            debug!(?kind, file_name = %file_name, "Upload skipped: unsupported file type");
            return Ok(None);
        }

        let path = self.fresh_path(kind, &file_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        }

        // create_new: never truncate bytes another record points at.
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        if let Err(err) = write_field(file, &path, &mut field).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!("Failed to remove partial upload {}: {cleanup}", path.display());
            }
            return Err(err);
        }

        debug!(?kind, path = %path.display(), "Upload stored");
        Ok(Some(path.to_string_lossy().into_owned()))
    }

    /// Remove a stored file that no record points at any more. Values
    /// outside the storage root, such as the placeholder defaults, are left
    /// alone.
    pub async fn discard(&self, stored: &str) {
        let path = Path::new(stored);
        if !path.starts_with(&self.root) {
            return;
        }
        if let Err(err) = fs::remove_file(path).await {
            warn!("Failed to discard upload {}: {err}", path.display());
        }
    }
}

async fn write_field(
    mut file: fs::File,
    path: &Path,
    field: &mut Field<'_>,
) -> Result<(), ApiError> {
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}
