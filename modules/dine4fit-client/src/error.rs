use thiserror::Error;

pub type Result<T> = std::result::Result<T, Dine4FitError>;

#[derive(Debug, Error)]
pub enum Dine4FitError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for Dine4FitError {
    fn from(err: reqwest::Error) -> Self {
        Dine4FitError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for Dine4FitError {
    fn from(err: quick_xml::DeError) -> Self {
        Dine4FitError::Decode(err.to_string())
    }
}

impl From<quick_xml::Error> for Dine4FitError {
    fn from(err: quick_xml::Error) -> Self {
        Dine4FitError::Decode(err.to_string())
    }
}
