use super::Error;

/// Error when the metamodel or configuration cannot be resolved.
///
/// This occurs when:
/// - An entity, attribute, or embeddable name does not exist
/// - An attribute type or converter is not registered with the type configuration
/// - A mapping is internally inconsistent (join column on the wrong table, a
///   version attribute that is not an integer)
///
/// Mapping errors are detected at boot or on first resolution and are fatal.
#[derive(Debug)]
pub(super) struct MappingError {
    message: Box<str>,
}

impl std::error::Error for MappingError {}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "mapping error: {}", self.message)
    }
}

impl Error {
    /// Creates a mapping error.
    pub fn mapping(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Mapping(MappingError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a mapping error.
    pub fn is_mapping(&self) -> bool {
        self.any_in_chain(|kind| matches!(kind, super::ErrorKind::Mapping(_)))
    }
}
