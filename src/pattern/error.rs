use thiserror::Error;

/// Malformed route declaration, or a reverse-routing request a pattern
/// cannot satisfy
///
/// Compilation errors are programmer errors: they surface at registration
/// time and abort router construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern '{pattern}': brace opened at {position} is never closed")]
    UnterminatedBrace { pattern: String, position: usize },
    #[error("pattern '{pattern}': unbalanced '}}' at {position}")]
    UnbalancedBrace { pattern: String, position: usize },
    #[error("pattern '{pattern}': invalid variable name '{name}'")]
    InvalidVariableName { pattern: String, name: String },
    #[error("pattern '{pattern}': duplicate variable '{name}'")]
    DuplicateVariable { pattern: String, name: String },
    #[error("pattern '{pattern}': '{segment}' must be the last segment")]
    NonTerminalGlob { pattern: String, segment: String },
    #[error("pattern '{pattern}': invalid regex for '{variable}': {message}")]
    InvalidRegex {
        pattern: String,
        variable: String,
        message: String,
    },
    #[error("pattern '{pattern}': no value supplied for '{name}'")]
    MissingVariable { pattern: String, name: String },
    #[error("pattern '{pattern}': value '{value}' does not satisfy '{name}'")]
    InvalidValue {
        pattern: String,
        name: String,
        value: String,
    },
    #[error("pattern '{pattern}': segment '{segment}' cannot be expanded")]
    NotExpandable { pattern: String, segment: String },
}
