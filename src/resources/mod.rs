//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod pet;

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::types::PlanResult;
use crate::value::DynamicValue;

/// Trait for resource operations
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Resource schema
    fn schema() -> Schema
    where
        Self: Sized;

    /// Create a new resource from its planned state
    async fn create(&self, planned: &DynamicValue) -> Result<DynamicValue, ProviderError>;

    /// Read an existing resource
    async fn read(&self, state: &DynamicValue) -> Result<DynamicValue, ProviderError>;

    /// Update an existing resource
    async fn update(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, ProviderError>;

    /// Delete a resource
    async fn delete(&self, state: &DynamicValue) -> Result<(), ProviderError>;

    /// Build the state an import starts from; Terraform reads it right after.
    async fn import(&self, id: &str) -> Result<DynamicValue, ProviderError>;
}

/// Plan a change from the schema alone.
///
/// - destroy: the planned state is null;
/// - create: computed-only attributes left null become unknown;
/// - update: the proposed state as is, with changed `force_new`
///   attributes listed for replacement.
pub fn plan_change(
    schema: &Schema,
    prior: Option<&DynamicValue>,
    proposed: DynamicValue,
) -> PlanResult {
    if proposed.is_null() {
        return PlanResult::in_place(DynamicValue::Null);
    }

    match prior {
        None => {
            let mut planned = proposed;
            for (name, attr) in &schema.block.attributes {
                let unset = planned.get(name).map_or(true, DynamicValue::is_null);
                if attr.flags.is_computed_only() && unset {
                    planned.set(name.clone(), DynamicValue::Unknown);
                }
            }
            PlanResult::in_place(planned)
        }
        Some(prior) => {
            let requires_replace = schema.replacement_paths(prior, &proposed);
            PlanResult::with_replacement(proposed, requires_replace)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("zone", Attribute::optional_string().with_force_new())
    }

    #[test]
    fn test_plan_create_marks_computed_unknown() {
        let proposed = DynamicValue::object([
            ("id", DynamicValue::Null),
            ("name", "a".into()),
            ("zone", DynamicValue::Null),
        ]);

        let plan = plan_change(&schema(), None, proposed);
        assert!(plan.planned_state.get("id").unwrap().is_unknown());
        assert!(plan.planned_state.get("zone").unwrap().is_null());
        assert!(!plan.replaces());
    }

    #[test]
    fn test_plan_update() {
        let prior = DynamicValue::object([
            ("id", "1".into()),
            ("name", "a".into()),
            ("zone", "eu".into()),
        ]);

        let rename = DynamicValue::object([
            ("id", "1".into()),
            ("name", "b".into()),
            ("zone", "eu".into()),
        ]);
        let plan = plan_change(&schema(), Some(&prior), rename.clone());
        assert_eq!(plan.planned_state, rename);
        assert!(!plan.replaces());

        let moved = DynamicValue::object([
            ("id", "1".into()),
            ("name", "a".into()),
            ("zone", "us".into()),
        ]);
        let plan = plan_change(&schema(), Some(&prior), moved);
        assert_eq!(plan.requires_replace, vec!["zone".to_string()]);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = DynamicValue::object([("id", "1".into())]);
        let plan = plan_change(&schema(), Some(&prior), DynamicValue::Null);
        assert!(plan.planned_state.is_null());
    }
}
