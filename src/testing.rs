//! Testing utilities for provider implementations.
//!
//! This module provides utilities to test `ProviderService` implementations
//! without spinning up a gRPC server or a Terraform binary.
//!
//! # Example
//!
//! ```ignore
//! use terraform_provider_petstore::testing::ProviderTester;
//! use terraform_provider_petstore::{DynamicValue, PetstoreProvider};
//!
//! #[tokio::test]
//! async fn test_lookup_user() {
//!     let tester = ProviderTester::new(PetstoreProvider::new("test"));
//!     tester
//!         .configure(DynamicValue::object([("server", "http://127.0.0.1:8080/v3".into())]))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .read_data_source("petstore_user", DynamicValue::object([("username", "theUser".into())]))
//!         .await
//!         .unwrap();
//!     assert_eq!(state.get("firstname").and_then(DynamicValue::as_str), Some("John"));
//! }
//! ```

use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::value::DynamicValue;

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and drives it the way Terraform would, minus
/// the wire encoding.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate provider configuration.
    pub async fn validate_provider_config(&self, config: DynamicValue) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if any of them is an error.
    pub async fn configure(&self, config: DynamicValue) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: DynamicValue,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: DynamicValue,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
        proposed_state: DynamicValue,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                DynamicValue::Null,
                DynamicValue::Null,
            )
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: DynamicValue,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read. Plans that require replacement
    /// are rejected, since Terraform would destroy and create instead.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
        proposed_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        if plan.replaces() {
            return Err(ProviderError::InvalidRequest(format!(
                "plan requires replacement of {:?}",
                plan.requires_replace
            )));
        }

        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Error diagnostics returned by the operation.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The operation itself failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("{} error diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("\n  {}", diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(())
    }
}

/// Assert that a plan updates in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.replaces(),
        "Expected plan to update in place, but it replaces {:?}",
        plan.requires_replace
    );
}

/// Assert that a plan replaces the resource because of `path`.
///
/// # Panics
///
/// Panics if `path` is not among the plan's replacement paths.
pub fn assert_plan_replaces_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.requires_replace.iter().any(|p| p == path),
        "Expected plan to replace on '{}', but replacement paths are {:?}",
        path,
        plan.requires_replace
    );
}

/// Assert that a planned attribute is unknown until apply.
///
/// # Panics
///
/// Panics if the attribute is missing or known.
pub fn assert_planned_unknown(plan: &PlanResult, attribute: &str) {
    let value = plan.planned_state.get(attribute);
    assert!(
        value.is_some_and(DynamicValue::is_unknown),
        "Expected '{}' to be unknown in the plan, got {:?}",
        attribute,
        value
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary.
///
/// # Panics
///
/// Panics if no error diagnostic has this summary.
pub fn assert_has_error(diagnostics: &[Diagnostic], summary: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary == summary),
        "Expected an error '{}', got {:?}",
        summary,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PetstoreProvider;

    fn pet(name: &str, category: Option<&str>) -> DynamicValue {
        let category = category.map_or(DynamicValue::Null, |name| {
            DynamicValue::object([("id", DynamicValue::Null), ("name", name.into())])
        });
        DynamicValue::object([
            ("id", DynamicValue::Null),
            ("name", name.into()),
            ("category", category),
            ("photo_urls", DynamicValue::Null),
            ("tags", DynamicValue::Null),
            ("status", DynamicValue::Null),
        ])
    }

    #[tokio::test]
    async fn test_plan_helpers() {
        let tester = ProviderTester::new(PetstoreProvider::new("test"));

        let plan = tester.plan_create("petstore_pet", pet("Rex", None)).await.unwrap();
        assert_planned_unknown(&plan, "id");
        assert_plan_updates_in_place(&plan);

        let mut prior = pet("Rex", Some("dogs"));
        prior.set("id", "7".into());
        let mut proposed = pet("Rex", Some("cats"));
        proposed.set("id", "7".into());
        let plan = tester
            .plan_update("petstore_pet", prior, proposed)
            .await
            .unwrap();
        assert_plan_replaces_attribute(&plan, "category");
    }

    #[tokio::test]
    async fn test_configure_reports_diagnostics() {
        let tester = ProviderTester::new(PetstoreProvider::new("test"));
        let err = tester
            .configure(DynamicValue::object([("server", DynamicValue::Unknown)]))
            .await
            .unwrap_err();

        match &err {
            TestError::Diagnostics(diags) => assert_has_error(diags, "Unknown Petstore API Host"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().contains("(at server)"));
    }

    #[test]
    fn test_check_diagnostics_ignores_warnings() {
        assert!(check_diagnostics(vec![Diagnostic::warning("careful")]).is_ok());
        assert!(check_diagnostics(vec![Diagnostic::error("broken")]).is_err());
        assert_no_errors(&[Diagnostic::warning("careful")]);
    }

    #[tokio::test]
    async fn test_metadata_lists_types() {
        let tester = ProviderTester::new(PetstoreProvider::new("test"));
        assert_eq!(tester.resource_types(), vec!["petstore_pet".to_string()]);
        assert_eq!(tester.data_source_types(), vec!["petstore_user".to_string()]);
    }
}
