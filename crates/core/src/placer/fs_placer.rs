//! File system placer implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::guard::normalize_path;
use crate::journal::{OperationJournal, OperationRecord};

use super::config::PlacerConfig;
use super::conflict::ConflictResolver;
use super::error::PlacerError;
use super::traits::Placer;
use super::types::{ConflictStrategy, OperationOutcome, PlacementRequest};

/// File system based placer.
///
/// Moves files into `base_dir/category[/subcategory]`, journaling every
/// directory it creates and every move it makes when a session is given.
pub struct FsPlacer {
    config: PlacerConfig,
    journal: Option<Arc<OperationJournal>>,
    resolver: ConflictResolver,
    /// Held while a directory is created and journaled, so no move into
    /// it can be recorded ahead of its creation.
    dir_lock: Mutex<()>,
}

impl FsPlacer {
    /// Creates a new file system placer.
    pub fn new(config: PlacerConfig, journal: Option<Arc<OperationJournal>>) -> Self {
        Self {
            config,
            journal,
            resolver: ConflictResolver::new(),
            dir_lock: Mutex::new(()),
        }
    }

    /// Creates a placer with default configuration and no journal.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default(), None)
    }

    pub fn config(&self) -> &PlacerConfig {
        &self.config
    }

    pub fn journal(&self) -> Option<&Arc<OperationJournal>> {
        self.journal.as_ref()
    }

    async fn record(
        &self,
        session_id: Option<&str>,
        record: OperationRecord,
    ) -> Result<(), PlacerError> {
        if let (Some(journal), Some(id)) = (&self.journal, session_id) {
            journal.record(id, record).await?;
        }
        Ok(())
    }

    /// Creates `dir` level by level, journaling each level this call created.
    async fn ensure_dirs(&self, dir: &Path, session_id: Option<&str>) -> Result<(), PlacerError> {
        let _guard = self.dir_lock.lock().await;

        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(path) = current {
            if path.exists() {
                break;
            }
            missing.push(path.to_path_buf());
            current = path.parent();
        }

        // Parent first, so rollback removes children before parents.
        for path in missing.into_iter().rev() {
            match fs::create_dir(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Created directory");
                    self.record(session_id, OperationRecord::created_directory(&path))
                        .await?;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(PlacerError::DirectoryCreationFailed { path, source: e });
                }
            }
        }
        Ok(())
    }

    async fn try_place(&self, request: &PlacementRequest) -> Result<OperationOutcome, PlacerError> {
        let source = &request.path;
        match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(PlacerError::SourceNotFound {
                    path: source.clone(),
                })
            }
        }

        let intended = compute_destination(
            &request.base_dir,
            source,
            &request.category,
            request.subcategory.as_deref(),
        )?;

        if normalize_path(source) == intended {
            debug!(path = %source.display(), "File already in place");
            return Ok(OperationOutcome::Skipped {
                source: source.clone(),
                destination: intended,
            });
        }

        if request.dry_run {
            let destination = self.resolver.preview(source, &intended, request.strategy)?;
            return Ok(OperationOutcome::DryRun {
                source: source.clone(),
                destination,
            });
        }

        let session_id = request.session_id.as_deref();
        if let (Some(journal), Some(id)) = (&self.journal, session_id) {
            journal.ensure_open(id).await?;
        }

        if let Some(parent) = intended.parent() {
            self.ensure_dirs(parent, session_id).await?;
        }

        let reservation = self.resolver.reserve(source, &intended, request.strategy)?;
        let destination = reservation.path().to_path_buf();
        let overwrite = request.strategy == ConflictStrategy::Overwrite && destination == intended;

        relocate(source, &destination, overwrite, self.config.buffer_size).await?;
        drop(reservation);

        info!(
            source = %source.display(),
            destination = %destination.display(),
            "Moved file"
        );

        self.record(session_id, OperationRecord::moved(source, &destination))
            .await?;

        Ok(OperationOutcome::Moved {
            source: source.clone(),
            destination,
        })
    }
}

#[async_trait]
impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn place(&self, request: &PlacementRequest) -> OperationOutcome {
        match self.try_place(request).await {
            Ok(outcome) => outcome,
            Err(PlacerError::ConflictSkip { destination }) => {
                debug!(
                    source = %request.path.display(),
                    destination = %destination.display(),
                    "Skipped conflicting file"
                );
                OperationOutcome::Skipped {
                    source: request.path.clone(),
                    destination,
                }
            }
            Err(error) => {
                warn!(path = %request.path.display(), error = %error, "Placement failed");
                OperationOutcome::Failed {
                    source: request.path.clone(),
                    error,
                }
            }
        }
    }
}

/// Computes `base_dir/category[/subcategory]/file_name`, lexically
/// normalized.
///
/// Fails with [`PlacerError::SecurityViolation`] when the result does not
/// stay under the normalized `base_dir`, which covers absolute categories
/// and `..` segments.
pub fn compute_destination(
    base_dir: &Path,
    source: &Path,
    category: &str,
    subcategory: Option<&str>,
) -> Result<PathBuf, PlacerError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| PlacerError::InvalidFileName {
            path: source.to_path_buf(),
        })?;

    let base = normalize_path(base_dir);
    let mut destination = base_dir.to_path_buf();
    for segment in std::iter::once(category).chain(subcategory) {
        let segment = Path::new(segment);
        if segment.has_root() || segment.is_absolute() {
            return Err(PlacerError::SecurityViolation {
                base_dir: base,
                destination: segment.to_path_buf(),
            });
        }
        destination.push(segment);
    }
    destination.push(file_name);

    let destination = normalize_path(&destination);
    let inside = destination
        .parent()
        .is_some_and(|parent| parent.starts_with(&base));
    if !inside {
        return Err(PlacerError::SecurityViolation {
            base_dir: base,
            destination,
        });
    }
    Ok(destination)
}

/// Moves `source` to `destination`: a rename when possible, otherwise a
/// buffered copy followed by removal of the source.
pub(crate) async fn relocate(
    source: &Path,
    destination: &Path,
    overwrite: bool,
    buffer_size: usize,
) -> Result<(), PlacerError> {
    match try_atomic_move(source, destination).await {
        Ok(true) => return Ok(()),
        Ok(false) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Cross-device move, falling back to copy"
            );
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PlacerError::SourceNotFound {
                path: source.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(PlacerError::move_failed(
                source.to_path_buf(),
                destination.to_path_buf(),
                e,
            ))
        }
    }

    if overwrite && destination.exists() {
        fs::remove_file(destination).await.map_err(|e| {
            PlacerError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
    }

    if let Err(e) = copy_file(source, destination, buffer_size).await {
        let _ = fs::remove_file(destination).await;
        return Err(e);
    }

    if let Err(e) = fs::remove_file(source).await {
        // Never leave two copies behind.
        let _ = fs::remove_file(destination).await;
        return Err(PlacerError::move_failed(
            source.to_path_buf(),
            destination.to_path_buf(),
            e,
        ));
    }
    Ok(())
}

/// Attempts to move a file atomically (rename).
///
/// Returns `Ok(false)` when source and destination are on different
/// filesystems.
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // EXDEV is 18 on Linux
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

async fn copy_file(
    source: &Path,
    destination: &Path,
    buffer_size: usize,
) -> Result<u64, PlacerError> {
    let copy_err = |e: std::io::Error| {
        PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
    };

    let source_file = File::open(source).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PlacerError::SourceNotFound {
                path: source.to_path_buf(),
            }
        } else {
            PlacerError::Io(e)
        }
    })?;

    let dest_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await
        .map_err(copy_err)?;

    let buffer_size = buffer_size.max(1);
    let mut reader = BufReader::with_capacity(buffer_size, source_file);
    let mut writer = BufWriter::with_capacity(buffer_size, dest_file);
    let mut buffer = vec![0u8; buffer_size];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).await.map_err(copy_err)?;
        if bytes_read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(copy_err)?;
        total_bytes += bytes_read as u64;
    }

    writer.flush().await.map_err(copy_err)?;
    Ok(total_bytes)
}
