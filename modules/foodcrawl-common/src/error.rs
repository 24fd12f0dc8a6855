use thiserror::Error;

pub type Result<T> = std::result::Result<T, FoodcrawlError>;

#[derive(Error, Debug)]
pub enum FoodcrawlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
}
