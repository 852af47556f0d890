use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid recipient phone number: {0}")]
    InvalidPhone(String),
    #[error("Invalid data volume: {0}")]
    InvalidVolume(String),
    #[error("The provider API key has not been configured")]
    MissingApiKey,
    #[error("No usable offer for network {0}")]
    NoOfferAvailable(String),
    #[error("Provider is unavailable: {0}")]
    Unavailable(String),
    #[error("Provider request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
}

impl ProviderError {
    /// True for errors caused by the caller's input, which will fail the same way no matter how often they are
    /// retried.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ProviderError::InvalidPhone(_) | ProviderError::InvalidVolume(_))
    }
}
