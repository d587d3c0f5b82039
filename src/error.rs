use std::fmt;

/// Result type for penguin-ai operations
pub type Result<T> = std::result::Result<T, MindError>;

/// Main error type for the decision-and-learning core
#[derive(Debug, Clone, PartialEq)]
pub enum MindError {
    /// `predict` or `train_on_batch` called before `initialize`
    ModelNotInitialized,

    /// A named checkpoint could not be read or decoded
    CheckpointLoad {
        name: String,
        reason: String,
    },

    /// A named checkpoint could not be written
    CheckpointSave {
        name: String,
        reason: String,
    },

    /// A training batch was rejected or produced unusable values
    TrainingBatch(String),

    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),

    /// Numerical computation errors
    Numerical(String),
}

impl fmt::Display for MindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MindError::ModelNotInitialized => write!(f, "Model not initialized"),
            MindError::CheckpointLoad { name, reason } => {
                write!(f, "Failed to load checkpoint '{}': {}", name, reason)
            }
            MindError::CheckpointSave { name, reason } => {
                write!(f, "Failed to save checkpoint '{}': {}", name, reason)
            }
            MindError::TrainingBatch(msg) => write!(f, "Training batch failed: {}", msg),
            MindError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            MindError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            MindError::Io(msg) => write!(f, "IO error: {}", msg),
            MindError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            MindError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for MindError {}

impl From<std::io::Error> for MindError {
    fn from(err: std::io::Error) -> Self {
        MindError::Io(err.to_string())
    }
}

impl From<bincode::Error> for MindError {
    fn from(err: bincode::Error) -> Self {
        MindError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MindError {
    fn from(err: serde_json::Error) -> Self {
        MindError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl MindError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        MindError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        MindError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn checkpoint_load<S: Into<String>, R: fmt::Display>(name: S, reason: R) -> Self {
        MindError::CheckpointLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn checkpoint_save<S: Into<String>, R: fmt::Display>(name: S, reason: R) -> Self {
        MindError::CheckpointSave {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
