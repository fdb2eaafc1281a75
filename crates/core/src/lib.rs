pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod guard;
pub mod hasher;
pub mod journal;
pub mod oracle;
pub mod placer;
pub mod scheduler;
pub mod testing;

pub use cache::{
    CacheEntry, CacheError, CacheStats, CacheStore, ClassificationResult, MemoryCacheStore,
    ResultCache, SqliteCacheStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, Config, ConfigError,
    JournalConfig,
};
pub use diagnostics::{
    create_diagnostics_channel, DiagnosticEnvelope, DiagnosticEvent, DiagnosticsHandle,
};
pub use guard::{normalize_path, validate_path, GuardError, GuardOptions};
pub use hasher::{fingerprint, Fingerprinter, HashError};
pub use journal::{
    JournalError, JournalStore, JsonFileJournalStore, MemoryJournalStore, OperationJournal,
    OperationRecord, RollbackResult, Session,
};
pub use oracle::{
    DefaultClassifier, ErrorClassifier, FailureKind, HttpOracle, Oracle, OracleConfig,
    OracleError, OracleOptions, OracleVerdict,
};
pub use placer::{
    compute_destination, resolve_conflict, ConflictResolver, ConflictStrategy, FsPlacer,
    OperationOutcome, PlacementRequest, Placer, PlacerConfig, PlacerError,
};
pub use scheduler::{
    ClassificationScheduler, ClassifyOptions, ItemFailure, OrganizeOptions, OrganizeReport,
    Organizer, RetryConfig, RetryPolicy, SchedulerConfig, SchedulerError, SchedulerMetrics,
};
