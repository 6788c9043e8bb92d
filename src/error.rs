use aws_sdk_dynamodb::error;

/// Errors returned by catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A batch write stopped early because a chunk call failed.
    #[error("batch write stopped after {written} written records: {source}")]
    Batch {
        /// The number of records submitted before the failure.
        written: usize,
        /// The error returned by the failing chunk call.
        source: aws_sdk_dynamodb::Error,
    },
    /// A DynamoDB call failed.
    #[error(transparent)]
    Dynamo(#[from] aws_sdk_dynamodb::Error),
    /// A record could not be converted to or from the attribute-value format.
    #[error(transparent)]
    Marshal(#[from] serde_dynamo::Error),
    /// Waiting for a created table to become active failed or timed out.
    #[error("waiting for the table to become active failed: {0}")]
    TableWait(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl<E, R> From<error::SdkError<E, R>> for Error
where
    aws_sdk_dynamodb::Error: From<error::SdkError<E, R>>,
{
    fn from(error: error::SdkError<E, R>) -> Self {
        Self::Dynamo(error.into())
    }
}

/// A specialized result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
