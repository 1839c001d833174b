use thiserror::Error;

/// Main error type for the genomic-neuralnet pipeline
#[derive(Error, Debug)]
pub enum GnError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Predictor error: {0}")]
    Predictor(#[from] PredictorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while loading or preparing marker/phenotype data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Trait not found in phenotype table: {trait_name}")]
    UnknownTrait { trait_name: String },

    #[error("Sample mismatch at position {position}: markers have '{marker_sample}', phenotypes have '{phenotype_sample}'")]
    SampleMismatch {
        position: usize,
        marker_sample: String,
        phenotype_sample: String,
    },

    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("Data parsing error in {source_name}: {message}")]
    ParseError { source_name: String, message: String },

    #[error("Dataset is empty after cleaning: {message}")]
    EmptyDataset { message: String },

    #[error("Degenerate fold {fold_index} of {folds}: {message}")]
    DegenerateFold {
        fold_index: usize,
        folds: usize,
        message: String,
    },
}

/// Errors raised by the execution backends
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Task broker unavailable at {url}: {reason}")]
    BrokerUnavailable { url: String, reason: String },

    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("Result for task {task_id} expired before it was fetched")]
    TaskExpired { task_id: String },

    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: String },

    #[error("Failed to build worker pool: {message}")]
    PoolBuildFailed { message: String },
}

/// Errors raised by the persistent result stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store {path}: {message}")]
    Open { path: String, message: String },

    #[error("Failed to read store {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to write store {path}: {message}")]
    Write { path: String, message: String },

    #[error("Store {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },
}

/// Errors raised by prediction methods
#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Unknown prediction method: {method}")]
    UnknownMethod { method: String },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Training failed for {method}: {message}")]
    TrainingFailed { method: String, message: String },
}

/// Result type alias for genomic-neuralnet operations
pub type GnResult<T> = Result<T, GnError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::GnError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::GnError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GnError::Config(format!($($arg)*))
    };
}
