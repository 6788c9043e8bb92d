use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Result, to_item};

/// The maximum number of operations DynamoDB accepts in one batch call.
///
/// Both `BatchWriteItem` and `BatchExecuteStatement` reject requests carrying
/// more than this many operations.
pub const MAX_BATCH_OPERATIONS: usize = 25;

/// Partition `records` into chunks sized for one batch call each.
///
/// Records beyond `max_records` are dropped before chunking. Order is
/// preserved within and across chunks, so concatenating the chunks in order
/// reproduces the (possibly truncated) input. An empty input yields no
/// chunks.
///
/// ```rust
/// use dynamodb_movies::batch;
///
/// let chunks = batch::chunks((0..50).collect(), Some(30));
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].len(), 25);
/// assert_eq!(chunks[1].len(), 5);
/// ```
pub fn chunks<T>(mut records: Vec<T>, max_records: Option<usize>) -> Vec<Vec<T>> {
    if let Some(max_records) = max_records {
        records.truncate(max_records);
    }
    let mut chunks = Vec::with_capacity(records.len().div_ceil(MAX_BATCH_OPERATIONS));
    while records.len() > MAX_BATCH_OPERATIONS {
        let rest = records.split_off(MAX_BATCH_OPERATIONS);
        chunks.push(records);
        records = rest;
    }
    if !records.is_empty() {
        chunks.push(records);
    }
    chunks
}

/// Convert records to wire requests, skipping records that fail to serialize.
///
/// A record that cannot be represented in the attribute-value format is
/// logged and dropped; it never fails the surrounding batch.
pub fn to_requests<T, R>(records: Vec<T>, convert: impl Fn(T) -> Result<R>) -> Vec<R> {
    let mut requests = Vec::with_capacity(records.len());
    for record in records {
        match convert(record) {
            Ok(request) => requests.push(request),
            Err(error) => {
                tracing::warn!(%error, "skipping record that could not be serialized");
            }
        }
    }
    requests
}

/// Build the write request that puts a record.
pub fn put_request<T: Serialize>(record: T) -> Result<types::WriteRequest> {
    let item = to_item(record)?;
    let put_request = types::PutRequest::builder()
        .set_item(Some(item))
        .build()
        .unwrap();
    Ok(types::WriteRequest::builder()
        .set_put_request(Some(put_request))
        .build())
}
