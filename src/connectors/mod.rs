//! Concrete connector implementations.

pub mod background_check;

use crate::config::ConnectorType;
use crate::connector::Connector;
use anyhow::Result;
use std::sync::Arc;

use self::background_check::store::ScreeningQueue;
use self::background_check::BackgroundCheckConnector;

/// Builds the concrete connector for a `(type, provider)` pair.
///
/// Types without an implementation yet are rejected rather than silently
/// registered as no-ops.
pub fn build_connector(
    connector_type: ConnectorType,
    provider: &str,
    queue: Arc<dyn ScreeningQueue>,
) -> Result<Arc<dyn Connector>> {
    match connector_type {
        ConnectorType::BackgroundCheck => {
            Ok(Arc::new(BackgroundCheckConnector::new(provider, queue)))
        }
        other => anyhow::bail!("Unsupported connector type '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::background_check::store::SqliteScreeningQueue;
    use super::*;

    fn make_queue() -> Arc<dyn ScreeningQueue> {
        Arc::new(SqliteScreeningQueue::new(":memory:").unwrap())
    }

    #[test]
    fn test_build_background_check_connector() {
        let connector =
            build_connector(ConnectorType::BackgroundCheck, "transunion", make_queue()).unwrap();
        assert_eq!(connector.connector_type(), ConnectorType::BackgroundCheck);
        assert_eq!(connector.provider(), "transunion");
    }

    #[test]
    fn test_unimplemented_type_is_rejected() {
        let err = build_connector(ConnectorType::Accounting, "quickbooks", make_queue())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported connector type"));
    }
}
