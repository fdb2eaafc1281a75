//! Destination conflict resolution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::error::PlacerError;
use super::types::ConflictStrategy;

/// Upper bound on `name(n)` candidates probed by the rename strategy.
pub const MAX_RENAME_ATTEMPTS: usize = 1000;

/// Picks the final destination for `intended` under `strategy`.
///
/// `is_taken` is the only probe; this function has no other side effects.
pub fn resolve_conflict(
    source: &Path,
    intended: &Path,
    strategy: ConflictStrategy,
    is_taken: impl Fn(&Path) -> bool,
) -> Result<PathBuf, PlacerError> {
    if !is_taken(intended) {
        return Ok(intended.to_path_buf());
    }

    match strategy {
        ConflictStrategy::Skip => Err(PlacerError::ConflictSkip {
            destination: intended.to_path_buf(),
        }),
        ConflictStrategy::Overwrite => Ok(intended.to_path_buf()),
        ConflictStrategy::Ask => Err(PlacerError::StrategyNotImplemented("ask")),
        ConflictStrategy::Rename => {
            let file_name = intended
                .file_name()
                .ok_or_else(|| PlacerError::InvalidFileName {
                    path: source.to_path_buf(),
                })?
                .to_string_lossy();
            let (stem, ext) = split_name(&file_name);

            for n in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = intended.with_file_name(format!("{stem}({n}){ext}"));
                if !is_taken(&candidate) {
                    debug!(
                        intended = %intended.display(),
                        resolved = %candidate.display(),
                        "Resolved name conflict"
                    );
                    return Ok(candidate);
                }
            }

            Err(PlacerError::TooManyConflicts {
                destination: intended.to_path_buf(),
                attempts: MAX_RENAME_ATTEMPTS,
            })
        }
    }
}

/// Splits `name` into stem and `.ext`. Dotfiles and extensionless names
/// keep the whole name as the stem.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Conflict resolution with in-process reservations.
///
/// A path handed out by [`reserve`](Self::reserve) counts as taken until
/// its [`Reservation`] drops, so concurrent placements never pick the same
/// destination.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves and reserves a destination.
    pub fn reserve(
        &self,
        source: &Path,
        intended: &Path,
        strategy: ConflictStrategy,
    ) -> Result<Reservation, PlacerError> {
        let mut reserved = self.reserved.lock().unwrap_or_else(|e| e.into_inner());

        // An overwrite of a path another placement holds would race it.
        let strategy = match strategy {
            ConflictStrategy::Overwrite if reserved.contains(intended) => ConflictStrategy::Rename,
            other => other,
        };

        let path = resolve_conflict(source, intended, strategy, |p| {
            reserved.contains(p) || p.exists()
        })?;
        reserved.insert(path.clone());

        Ok(Reservation {
            path,
            reserved: Arc::clone(&self.reserved),
        })
    }

    /// Resolves without reserving. Used for dry runs.
    pub fn preview(
        &self,
        source: &Path,
        intended: &Path,
        strategy: ConflictStrategy,
    ) -> Result<PathBuf, PlacerError> {
        resolve_conflict(source, intended, strategy, |p| p.exists())
    }

    /// Number of live reservations.
    pub fn reserved_count(&self) -> usize {
        self.reserved.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// A destination held for one placement. Released on drop.
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Reservation {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.reserved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn taken(set: &[&str]) -> impl Fn(&Path) -> bool {
        let set: HashSet<PathBuf> = set.iter().map(PathBuf::from).collect();
        move |p: &Path| set.contains(p)
    }

    #[test]
    fn test_free_destination_is_unchanged() {
        for strategy in [
            ConflictStrategy::Skip,
            ConflictStrategy::Overwrite,
            ConflictStrategy::Rename,
            ConflictStrategy::Ask,
        ] {
            let resolved =
                resolve_conflict(Path::new("/in/a.txt"), Path::new("/out/a.txt"), strategy, taken(&[]))
                    .unwrap();
            assert_eq!(resolved, PathBuf::from("/out/a.txt"));
        }
    }

    #[test]
    fn test_rename_picks_first_free_suffix() {
        let resolved = resolve_conflict(
            Path::new("/in/a.txt"),
            Path::new("/out/a.txt"),
            ConflictStrategy::Rename,
            taken(&["/out/a.txt", "/out/a(1).txt"]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/out/a(2).txt"));
    }

    #[test]
    fn test_rename_extensionless_and_dotfiles() {
        let resolved = resolve_conflict(
            Path::new("/in/Makefile"),
            Path::new("/out/Makefile"),
            ConflictStrategy::Rename,
            taken(&["/out/Makefile"]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/out/Makefile(1)"));

        let resolved = resolve_conflict(
            Path::new("/in/.env"),
            Path::new("/out/.env"),
            ConflictStrategy::Rename,
            taken(&["/out/.env"]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/out/.env(1)"));
    }

    #[test]
    fn test_rename_keeps_only_last_extension() {
        let resolved = resolve_conflict(
            Path::new("/in/backup.tar.gz"),
            Path::new("/out/backup.tar.gz"),
            ConflictStrategy::Rename,
            taken(&["/out/backup.tar.gz"]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/out/backup.tar(1).gz"));
    }

    #[test]
    fn test_rename_gives_up() {
        let result = resolve_conflict(
            Path::new("/in/a.txt"),
            Path::new("/out/a.txt"),
            ConflictStrategy::Rename,
            |_| true,
        );
        assert!(matches!(
            result,
            Err(PlacerError::TooManyConflicts {
                attempts: MAX_RENAME_ATTEMPTS,
                ..
            })
        ));
    }

    #[test]
    fn test_skip_overwrite_ask() {
        let busy = taken(&["/out/a.txt"]);
        let src = Path::new("/in/a.txt");
        let dst = Path::new("/out/a.txt");

        assert!(matches!(
            resolve_conflict(src, dst, ConflictStrategy::Skip, &busy),
            Err(PlacerError::ConflictSkip { .. })
        ));
        assert_eq!(
            resolve_conflict(src, dst, ConflictStrategy::Overwrite, &busy).unwrap(),
            dst
        );
        assert!(matches!(
            resolve_conflict(src, dst, ConflictStrategy::Ask, &busy),
            Err(PlacerError::StrategyNotImplemented("ask"))
        ));
    }

    #[test]
    fn test_reservations_are_injective() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "existing").unwrap();
        let intended = temp.path().join("a.txt");
        let resolver = ConflictResolver::new();

        let reservations: Vec<Reservation> = (0..5)
            .map(|_| {
                resolver
                    .reserve(Path::new("/in/a.txt"), &intended, ConflictStrategy::Rename)
                    .unwrap()
            })
            .collect();

        let unique: HashSet<&Path> = reservations.iter().map(|r| r.path()).collect();
        assert_eq!(unique.len(), 5);
        assert!(unique.contains(temp.path().join("a(1).txt").as_path()));
        assert!(unique.contains(temp.path().join("a(5).txt").as_path()));
        assert_eq!(resolver.reserved_count(), 5);

        drop(reservations);
        assert_eq!(resolver.reserved_count(), 0);
    }

    #[test]
    fn test_reserved_overwrite_falls_back_to_rename() {
        let temp = TempDir::new().unwrap();
        let intended = temp.path().join("a.txt");
        let resolver = ConflictResolver::new();

        let first = resolver
            .reserve(Path::new("/in/a.txt"), &intended, ConflictStrategy::Overwrite)
            .unwrap();
        let second = resolver
            .reserve(Path::new("/in/b/a.txt"), &intended, ConflictStrategy::Overwrite)
            .unwrap();

        assert_eq!(first.path(), intended);
        assert_eq!(second.path(), temp.path().join("a(1).txt"));
    }

    #[test]
    fn test_preview_reserves_nothing() {
        let temp = TempDir::new().unwrap();
        let intended = temp.path().join("a.txt");
        let resolver = ConflictResolver::new();

        let first = resolver
            .preview(Path::new("/in/a.txt"), &intended, ConflictStrategy::Rename)
            .unwrap();
        let second = resolver
            .preview(Path::new("/in/a.txt"), &intended, ConflictStrategy::Rename)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.reserved_count(), 0);
    }
}
