//! Data Source Implementations

pub mod user;

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::value::DynamicValue;

/// Trait for read-only lookups
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Data source type name
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Data source schema
    fn schema() -> Schema
    where
        Self: Sized;

    /// Resolve the configuration into the full data source state
    async fn read(&self, config: &DynamicValue) -> Result<DynamicValue, ProviderError>;
}
