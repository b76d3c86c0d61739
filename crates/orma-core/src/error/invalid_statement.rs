use super::Error;

/// Error when a query or statement is constructed incorrectly.
///
/// This occurs when:
/// - An alias is declared twice in one select clause or from clause
/// - A singleton clause (where, having, limit, offset) is set a second time
/// - A construct is rejected under strict compliance (aliased fetch joins)
/// - A query string cannot be parsed, or a parameter is left unbound
///
/// These errors are reported immediately to the caller and never corrected.
#[derive(Debug)]
pub(super) struct InvalidStatement {
    pub(super) message: Box<str>,
}

impl std::error::Error for InvalidStatement {}

impl core::fmt::Display for InvalidStatement {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid statement: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid statement error.
    pub fn invalid_statement(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidStatement(InvalidStatement {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid statement error.
    pub fn is_invalid_statement(&self) -> bool {
        self.any_in_chain(|kind| matches!(kind, super::ErrorKind::InvalidStatement(_)))
    }
}
