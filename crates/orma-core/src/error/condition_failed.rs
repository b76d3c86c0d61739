use super::Error;

/// Error when a write did not affect the expected number of rows.
///
/// This occurs when:
/// - A versioned update or delete finds the row at a different version
/// - An update or delete by identifier finds no row to modify
#[derive(Debug)]
pub(super) struct ConditionFailedError {
    context: Option<Box<str>>,
}

impl std::error::Error for ConditionFailedError {}

impl core::fmt::Display for ConditionFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("condition failed")?;
        if let Some(ref ctx) = self.context {
            write!(f, ": {}", ctx)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a condition failed error.
    pub fn condition_failed(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ConditionFailed(ConditionFailedError {
            context: Some(context.into().into()),
        }))
    }

    /// Returns `true` if this error is a condition failed error.
    pub fn is_condition_failed(&self) -> bool {
        self.any_in_chain(|kind| matches!(kind, super::ErrorKind::ConditionFailed(_)))
    }
}
