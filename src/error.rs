//! Error types for every stage of the release synchronization pipeline.
//!
//! Each stage owns one error enum; [`PipelineError`] wraps them so the
//! operator always learns which stage failed, together with actionable
//! recovery suggestions.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage, used to label failures and the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Argument and environment validation
    Configuration,
    /// Version resolution
    Resolve,
    /// Artifact build/publish and digest lookup
    Artifact,
    /// Working copy reconciliation
    Sync,
    /// Descriptor patching
    Patch,
    /// External lint step
    Verify,
    /// Commit, push and pull request handling
    Propose,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 7] = [
        Stage::Configuration,
        Stage::Resolve,
        Stage::Artifact,
        Stage::Sync,
        Stage::Patch,
        Stage::Verify,
        Stage::Propose,
    ];

    /// Human readable stage name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Configuration => "configuration",
            Stage::Resolve => "version resolution",
            Stage::Artifact => "artifact",
            Stage::Sync => "repository sync",
            Stage::Patch => "descriptor patch",
            Stage::Verify => "verify",
            Stage::Propose => "change proposal",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for all pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid flag combination or missing requirement
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Version lookup failure
    #[error("Version resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Build/publish failure
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    /// Digest missing or malformed
    #[error("Digest error: {0}")]
    Digest(#[from] DigestError),

    /// Repository reconciliation failure
    #[error("Repository sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Missing or malformed descriptor files
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Lint step failure
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Push or pull request failure
    #[error("Change proposal failed: {0}")]
    Proposal(#[from] ProposalError),
}

/// Invalid configuration detected before any action is taken
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// A flag requires another value that was not supplied
    #[error("--{flag} requires --{required}")]
    MissingRequirement {
        /// Flag that was set
        flag: String,
        /// Option that must accompany it
        required: String,
    },

    /// Value could not be interpreted
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Option or variable name
        field: String,
        /// Reason for the error
        reason: String,
    },

    /// Required executable not found on PATH
    #[error("Required tool '{tool}' not found on PATH ({purpose})")]
    MissingTool {
        /// Executable name
        tool: String,
        /// Why the tool is needed
        purpose: String,
    },

    /// Authentication token not present in the environment
    #[error("GitHub token not provided. Set GH_TOKEN or GITHUB_TOKEN")]
    MissingToken,
}

/// Version resolution errors
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Release feed could not be queried
    #[error("Could not query latest release of {project}: {source}")]
    FeedUnavailable {
        /// Project slug
        project: String,
        /// Underlying host error
        #[source]
        source: HostError,
    },

    /// Response carried no usable tag
    #[error("Latest release of {project} has no tag")]
    MissingTag {
        /// Project slug
        project: String,
    },
}

/// Artifact build/publish errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build process could not run to completion
    #[error("{0}")]
    Command(#[from] CommandError),

    /// Version cannot be used as an image tag
    #[error("Version '{version}' is not a valid image tag")]
    InvalidTag {
        /// Offending value
        version: String,
    },

    /// Build process exited non-zero
    #[error("docker buildx build for {image_ref} exited with code {code}: {stderr}")]
    Failed {
        /// Image reference being published
        image_ref: String,
        /// Exit code (-1 when killed by a signal)
        code: i32,
        /// Captured standard error
        stderr: String,
    },
}

/// Digest errors
#[derive(Error, Debug)]
pub enum DigestError {
    /// Value does not have the `<algorithm>:<hex>` shape
    #[error("Digest '{value}' is not of the form <algorithm>:<hex>")]
    Malformed {
        /// Offending value
        value: String,
    },

    /// Registry inspection failed
    #[error("Could not inspect {image_ref}: {reason}")]
    InspectFailed {
        /// Image reference inspected
        image_ref: String,
        /// Reason for the error
        reason: String,
    },

    /// Inspection process could not run to completion
    #[error("{0}")]
    Command(#[from] CommandError),
}

/// Repository reconciliation errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// A git operation failed
    #[error("{0}")]
    Git(#[from] GitError),

    /// Fork lookup through the hosting API failed
    #[error("Fork lookup failed: {0}")]
    ForkLookup(#[from] HostError),

    /// Work directory could not be prepared
    #[error("Cannot prepare work directory {path}: {source}")]
    WorkDir {
        /// Work directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Descriptor errors
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Descriptor file missing
    #[error("Descriptor not found: {path}")]
    Missing {
        /// Expected file path
        path: PathBuf,
    },

    /// Descriptor does not contain a field the patcher must rewrite
    #[error("Descriptor {path} has no '{field}' field")]
    FieldNotFound {
        /// File path
        path: PathBuf,
        /// Field name
        field: String,
    },

    /// Template directory for first-time onboarding missing
    #[error("Template directory not found: {path}")]
    TemplateMissing {
        /// Template path
        path: PathBuf,
    },

    /// Reading, writing or copying failed
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Lint step errors
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Lint process could not run to completion
    #[error("{0}")]
    Command(#[from] CommandError),

    /// Lint reported problems
    #[error("Lint of '{entry}' exited with code {code}")]
    LintFailed {
        /// App id that was linted
        entry: String,
        /// Exit code (-1 when killed by a signal)
        code: i32,
    },
}

/// Change proposal errors
#[derive(Error, Debug)]
pub enum ProposalError {
    /// A git operation failed
    #[error("{0}")]
    Git(#[from] GitError),

    /// Hosting API call failed
    #[error("{0}")]
    Host(#[from] HostError),

    /// The branch could not be pushed
    #[error("Push of '{branch}' failed: {reason}")]
    PushFailed {
        /// Branch name
        branch: String,
        /// Reason for the error
        reason: String,
    },

    /// Origin remote URL could not be mapped to an owner
    #[error("Cannot determine owner of origin remote '{url}'")]
    UnknownOrigin {
        /// Remote URL
        url: String,
    },

    /// Entry directory could not be carried onto the proposal branch
    #[error("Cannot carry {path} onto the proposal branch: {source}")]
    Carry {
        /// Path involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single git invocation
#[derive(Error, Debug)]
pub enum GitError {
    /// Process could not run to completion
    #[error("{0}")]
    Command(#[from] CommandError),

    /// Git exited non-zero
    #[error("git {operation} failed (exit {code}): {stderr}")]
    Failed {
        /// Git subcommand
        operation: String,
        /// Exit code
        code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// Object being created already exists
    #[error("git {operation}: '{name}' already exists")]
    AlreadyExists {
        /// Git subcommand
        operation: String,
        /// Name of the existing object
        name: String,
    },

    /// Push rejected by the remote
    #[error("git push of '{branch}' rejected: {stderr}")]
    PushRejected {
        /// Branch name
        branch: String,
        /// Captured standard error
        stderr: String,
    },
}

/// Failure of a code-hosting API call
#[derive(Error, Debug)]
pub enum HostError {
    /// Transport-level failure
    #[error("HTTP request to {url} failed: {source}")]
    Request {
        /// Request URL
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// Status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {reason}")]
    Decode {
        /// Request URL
        url: String,
        /// Reason for the error
        reason: String,
    },

    /// Client could not be constructed
    #[error("HTTP client initialization failed: {0}")]
    Client(String),
}

/// Failure to run an external process to completion
#[derive(Error, Debug)]
pub enum CommandError {
    /// Process could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Process exceeded its deadline and was killed
    #[error("'{command}' timed out after {}s", timeout.as_secs())]
    TimedOut {
        /// Command line
        command: String,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// Waiting on the process failed
    #[error("Failed waiting for '{command}': {source}")]
    Wait {
        /// Command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Configuration(_) => Stage::Configuration,
            PipelineError::Resolution(_) => Stage::Resolve,
            PipelineError::Build(_) | PipelineError::Digest(_) => Stage::Artifact,
            PipelineError::Sync(_) => Stage::Sync,
            PipelineError::Descriptor(_) => Stage::Patch,
            PipelineError::Verify(_) => Stage::Verify,
            PipelineError::Proposal(_) => Stage::Propose,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PipelineError::Configuration(ConfigurationError::MissingRequirement {
                required,
                ..
            }) => vec![format!("Pass --{required} or drop the flag that requires it")],
            PipelineError::Configuration(ConfigurationError::MissingToken) => vec![
                "Export GH_TOKEN with a token that can read releases and open pull requests"
                    .to_string(),
                "Or authenticate with `gh auth login` and export GH_TOKEN=$(gh auth token)"
                    .to_string(),
            ],
            PipelineError::Configuration(ConfigurationError::MissingTool { tool, .. }) => vec![
                format!("Install '{tool}' and make sure it is on PATH"),
            ],
            PipelineError::Resolution(_) => vec![
                "Pass --version explicitly to skip the release lookup".to_string(),
            ],
            PipelineError::Build(BuildError::InvalidTag { .. }) => vec![
                "Docker tags allow [A-Za-z0-9_.-] and at most 128 characters".to_string(),
            ],
            PipelineError::Build(_) => vec![
                "Check `docker buildx ls` and that you are logged in to the registry".to_string(),
                "Pass --skip-build --digest <algo:hex> to reuse an existing image".to_string(),
            ],
            PipelineError::Digest(_) => vec![
                "Inspect the tag manually: docker buildx imagetools inspect <image>:<version>"
                    .to_string(),
            ],
            PipelineError::Sync(SyncError::Git(_)) => vec![
                "Verify network access and credentials: git ls-remote <repository>".to_string(),
                "Delete the working copy under --work-dir to force a fresh clone".to_string(),
            ],
            PipelineError::Descriptor(DescriptorError::TemplateMissing { .. }) => vec![
                "Point --template-dir at a directory containing the app descriptors".to_string(),
            ],
            PipelineError::Verify(_) => vec![
                "Run the lint command manually in the working copy".to_string(),
                "Pass --skip-verify to bypass the lint step".to_string(),
            ],
            PipelineError::Proposal(ProposalError::PushFailed { .. }) => vec![
                "Check push permissions on the fork: git remote -v".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

impl GitError {
    /// Whether the failure means the object being created already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, GitError::AlreadyExists { .. })
    }
}
