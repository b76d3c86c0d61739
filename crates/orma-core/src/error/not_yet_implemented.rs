use super::Error;

/// Marks a translation path that exists in the model but is not implemented.
///
/// Distinct from bugs so callers and tests can detect feature gaps.
#[derive(Debug)]
pub(super) struct NotYetImplemented {
    feature: Box<str>,
}

impl std::error::Error for NotYetImplemented {}

impl core::fmt::Display for NotYetImplemented {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "not yet implemented: {}", self.feature)
    }
}

impl Error {
    /// Creates a not yet implemented error.
    pub fn not_yet_implemented(feature: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NotYetImplemented(NotYetImplemented {
            feature: feature.into().into(),
        }))
    }

    /// Returns `true` if this error marks an unimplemented feature.
    pub fn is_not_yet_implemented(&self) -> bool {
        self.any_in_chain(|kind| matches!(kind, super::ErrorKind::NotYetImplemented(_)))
    }
}
