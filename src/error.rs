use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmartSafeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: missing field '{field}'")]
    InvalidInput { field: String },

    #[error("Upload failed for '{key}': {details}")]
    Upload { key: String, details: String },

    #[error("Transport error on '{topic}': {details}")]
    Transport { topic: String, details: String },

    #[error("Hardware fault in {component}: {details}")]
    Hardware { component: String, details: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl SmartSafeError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input<S: Into<String>>(field: S) -> Self {
        Self::InvalidInput {
            field: field.into(),
        }
    }

    pub fn hardware<S: Into<String>>(component: S, details: S) -> Self {
        Self::Hardware {
            component: component.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SmartSafeError>;
