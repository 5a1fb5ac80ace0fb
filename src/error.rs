use thiserror::Error;

pub const CLOUD_ERROR: &str = "Bosh::Clouds::CloudError";
pub const VM_CREATION_FAILED: &str = "Bosh::Clouds::VMCreationFailed";
pub const NOT_IMPLEMENTED: &str = "Bosh::Clouds::NotImplemented";

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}: {body}")]
    ApiError { method: String, url: String, status: u16, body: String },

    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    NotFoundError(String),

    #[error("{0}")]
    ConflictError(String),

    #[error("method {0} is not implemented")]
    NotImplemented(String),

    #[error("unable to reserve node: {0}")]
    ReservationError(Box<Error>),

    #[error("failed to publish {name}: {reason}")]
    PublishError { name: String, reason: String },

    #[error("workflow {workflow} failed on node {node_id}")]
    WorkflowFailed { workflow: String, node_id: String },

    #[error("workflow {workflow} on node {node_id} timed out after {timeout_s}s")]
    WorkflowTimeout { workflow: String, node_id: String, timeout_s: u64 },

    #[error("could not abort timed-out workflow {workflow} on node {node_id}: {cause}")]
    WorkflowAbortError { workflow: String, node_id: String, cause: Box<Error> },

    #[error("workflow {workflow} on node {node_id} reported unrecognized status '{status}'")]
    UnrecognizedWorkflowStatus { workflow: String, node_id: String, status: String },

    #[error("{operation} failed: {source}")]
    OperationError { operation: &'static str, source: Box<Error> },
}

impl Error {
    /// Wraps an error with the name of the CPI operation that produced it.
    pub fn during(operation: &'static str, source: Error) -> Self {
        match source {
            Error::OperationError { .. } => source,
            other => Error::OperationError { operation, source: Box::new(other) },
        }
    }

    /// Only contention on the node pool is worth a retry by the director.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ReservationError(cause) => !matches!(**cause, Error::ValidationError(_) | Error::ConflictError(_)),
            Error::OperationError { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn bosh_type(&self) -> &'static str {
        match self {
            Error::NotImplemented(_) => NOT_IMPLEMENTED,
            Error::OperationError { operation: "create_vm", .. } => VM_CREATION_FAILED,
            _ => CLOUD_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
