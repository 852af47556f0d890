use bundle_provider::ProviderError;
use thiserror::Error;

/// Why a fulfillment step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    /// Bad phone number or data amount. Retrying cannot help.
    #[error("Invalid order details. {0}")]
    InvalidInput(String),
    #[error("No usable provider offer. {0}")]
    NoOfferAvailable(String),
    /// Timeouts, transport errors and 5xx responses
    #[error("Provider unavailable. {0}")]
    ProviderUnavailable(String),
    #[error("Provider rejected the order. {0}")]
    ProviderRejected(String),
    /// The process is misconfigured (e.g. no API key). Uses up a retry like an outage.
    #[error("Configuration error. {0}")]
    Configuration(String),
    #[error("Database error. {0}")]
    PersistenceError(String),
}

impl FulfillmentError {
    /// Fatal errors fail the order straight away without using up a retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FulfillmentError::InvalidInput(_) | FulfillmentError::NoOfferAvailable(_))
    }

    pub fn persistence<E: std::error::Error>(e: E) -> Self {
        FulfillmentError::PersistenceError(e.to_string())
    }
}

impl From<ProviderError> for FulfillmentError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::InvalidPhone(_) | ProviderError::InvalidVolume(_) => Self::InvalidInput(e.to_string()),
            ProviderError::NoOfferAvailable(_) => Self::NoOfferAvailable(e.to_string()),
            ProviderError::MissingApiKey | ProviderError::Initialization(_) => Self::Configuration(e.to_string()),
            ProviderError::Unavailable(_) | ProviderError::QueryError { .. } | ProviderError::JsonError(_) => {
                Self::ProviderUnavailable(e.to_string())
            },
        }
    }
}
