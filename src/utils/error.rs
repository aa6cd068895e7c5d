use thiserror::Error;

#[derive(Error, Debug)]
pub enum OnusError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{table} is missing required columns: {}", missing.join(", "))]
    SchemaError { table: String, missing: Vec<String> },

    #[error("{table}, row {row}, column {column}: invalid value '{value}' ({reason})")]
    ParseError {
        table: String,
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("No municipality found for service area '{area}' in {state} ({year})")]
    EmptyResultError { year: u16, state: String, area: String },

    #[error("Term {term} covers no municipality after exclusions")]
    EmptyCoverageError { term: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Schema,
    Data,
    Coverage,
    Validation,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OnusError {
    pub fn validation(message: impl Into<String>) -> Self {
        OnusError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OnusError::ZipError(_) | OnusError::IoError(_) | OnusError::SerializationError(_) => {
                ErrorCategory::Io
            }
            OnusError::CsvError(_) | OnusError::SchemaError { .. } => ErrorCategory::Schema,
            OnusError::ParseError { .. } => ErrorCategory::Data,
            OnusError::EmptyResultError { .. } | OnusError::EmptyCoverageError { .. } => {
                ErrorCategory::Coverage
            }
            OnusError::ValidationError { .. } => ErrorCategory::Validation,
            OnusError::ConfigError { .. }
            | OnusError::MissingConfigError { .. }
            | OnusError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Coverage => ErrorSeverity::Low,
            ErrorCategory::Validation | ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Schema | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Per-term and per-calculation failures; a batch keeps going after these.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OnusError::EmptyResultError { .. }
                | OnusError::EmptyCoverageError { .. }
                | OnusError::ValidationError { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OnusError::SchemaError { table, missing } => format!(
                "The file {} does not contain the required columns: {}",
                table,
                missing.join(", ")
            ),
            OnusError::EmptyCoverageError { term } => format!(
                "Term {} was rejected: its exclusions remove every municipality of the service area",
                term
            ),
            OnusError::ValidationError { message } => message.clone(),
            OnusError::IoError(e) => format!("Could not read or write a file: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the input files exist and the output directory is writable",
            ErrorCategory::Schema => "Compare the CSV header with the expected column names",
            ErrorCategory::Data => "Fix the malformed value in the reported row and column",
            ErrorCategory::Coverage => "Review the service area and the exclusion lists of the term",
            ErrorCategory::Validation => "Provide every selection and a positive ROL",
            ErrorCategory::Configuration => "Review the configuration file or command-line flags",
        }
    }
}

pub type Result<T> = std::result::Result<T, OnusError>;
