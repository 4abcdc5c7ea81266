use thiserror::Error;

#[derive(Error, Debug)]
pub enum PomupError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("POM parsing failed: {0}")]
    PomParsing(String),

    #[error("Maven execution failed: {0}")]
    MavenExecution(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Edit failed: {0}")]
    Edit(String),

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PomupError>;
