use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage connection failed: {0}")]
    Connection(String),
    #[error("Storage query failed: {0}")]
    Query(String),
    #[error("Stored value could not be decoded: {0}")]
    Corrupt(String)
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(error.to_string())
            }
            other => StoreError::Query(other.to_string())
        }
    }
}
