use thiserror::Error;

#[derive(Debug, Error)]
pub enum IctlError {
    #[error("not authenticated: run 'ictl auth login' or set INTERACTIVE_API_KEY")]
    Unauthenticated,

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("no {0} given: set it in the manifest, pass it as a flag, or select one first")]
    MissingContext(&'static str),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' not found: this API key is scoped to {kind} '{scoped}'")]
    NotFoundInScope {
        kind: &'static str,
        name: String,
        scoped: String,
    },

    #[error("{kind} name '{name}' is ambiguous: {count} matches")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("invalid {scope}: {field}: {reason}")]
    Validation {
        scope: String,
        field: String,
        reason: String,
    },

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("{action} service '{service}': {cause}")]
    Reconcile {
        action: &'static str,
        service: String,
        cause: Box<IctlError>,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("home directory not found: set HOME or INTERACTIVE_CONFIG_DIR")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl IctlError {
    pub fn validation(
        scope: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        IctlError::Validation {
            scope: scope.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status carried by a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            IctlError::Remote { status, .. } => Some(*status),
            IctlError::Reconcile { cause, .. } => cause.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IctlError>;
