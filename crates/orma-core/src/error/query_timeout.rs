use std::time::Duration;

use super::{Error, ErrorKind};

#[derive(Debug)]
pub(super) struct QueryTimeout {
    duration: Duration,
}

impl Error {
    pub fn query_timeout(duration: Duration) -> Error {
        ErrorKind::QueryTimeout(QueryTimeout { duration }).into()
    }

    pub fn is_query_timeout(&self) -> bool {
        self.any_in_chain(|kind| matches!(kind, ErrorKind::QueryTimeout(_)))
    }
}

impl std::error::Error for QueryTimeout {}

impl core::fmt::Display for QueryTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement timed out after {:?}", self.duration)
    }
}
