use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    NoApp { app_name: String },
    DuplicateApp { app_name: String },
    MissingProjectId,
    InvalidOptions { message: String },
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoApp { .. } => "app/no-app",
            AppError::DuplicateApp { .. } => "app/duplicate-app",
            AppError::MissingProjectId => "app/missing-project-id",
            AppError::InvalidOptions { .. } => "app/invalid-options",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoApp { app_name } => {
                write!(f, "No Firebase App '{app_name}' has been created - call init_database() first")
            }
            AppError::DuplicateApp { app_name } => {
                write!(f, "Firebase App named '{app_name}' already exists")
            }
            AppError::MissingProjectId => {
                write!(f, "Firebase options must include a project_id")
            }
            AppError::InvalidOptions { message } => {
                write!(f, "Invalid Firebase options: {message}")
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidOptions {
            message: err.to_string(),
        }
    }
}
