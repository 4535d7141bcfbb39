use crate::types::BackendKind;

/// Errors that can occur across the Tributary pipeline.
///
/// Library crates use this type directly; the binary crate converts to
/// `miette` diagnostics at the boundary.
///
/// The two synchronization variants are deliberately distinct from
/// [`TributaryError::UnsupportedBackend`]: a missing backend means one
/// repository is skipped and reported, while missing or failed
/// synchronization aborts the whole run. Computing centrality over
/// whichever repositories happened to be on disk would silently bias
/// cross-repository comparisons.
///
/// # Examples
///
/// ```
/// use tributary_core::TributaryError;
///
/// let err = TributaryError::Config("bad date range".into());
/// assert!(err.to_string().contains("bad date range"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TributaryError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Malformed registry list file or duplicate repository entry.
    #[error("registry error: {0}")]
    Registry(String),

    /// No commit-reading implementation exists for this backend kind.
    /// Non-fatal: the repository is skipped and the build continues.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(BackendKind),

    /// No local clone exists for a repository the build needs.
    /// Fatal for the run.
    #[error("repository {0} has no local clone; run sync first")]
    SyncRequired(String),

    /// Synchronization against the remote failed. Fatal for the run.
    #[error("synchronization failed for {0}")]
    SyncFailed(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TributaryError {
    /// Returns `true` if this error should abort the whole build rather
    /// than skip a single repository.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TributaryError::UnsupportedBackend(_))
    }
}
