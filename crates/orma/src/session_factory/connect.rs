use orma_core::{driver::Driver, err, Error, Result};

use std::sync::Arc;
use url::Url;

/// Picks the built-in driver for the URL scheme.
pub(super) fn driver(url: &str) -> Result<Arc<dyn Driver>> {
    let parsed = Url::parse(url).map_err(Error::driver_operation_failed)?;

    match parsed.scheme() {
        "sqlite" => connect_sqlite(url),
        scheme => Err(err!("unsupported database; scheme={scheme}; url={url}")),
    }
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &str) -> Result<Arc<dyn Driver>> {
    Ok(Arc::new(orma_driver_sqlite::Sqlite::new(url)?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &str) -> Result<Arc<dyn Driver>> {
    Err(err!("`sqlite` feature not enabled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scheme() {
        let err = driver("oracle://localhost/db").unwrap_err();
        assert!(err.to_string().contains("unsupported database"), "{err}");
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(driver("not a url").is_err());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn in_memory_sqlite() {
        let driver = driver("sqlite::memory:").unwrap();
        assert_eq!(driver.url(), "sqlite::memory:");
    }
}
