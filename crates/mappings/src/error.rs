use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Mapping catalog unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Failed to fetch mapping for {language}: {message}")]
    MappingFetch { language: String, message: String },
}

