//! Convenience types for provider implementations.
//!
//! These types provide a more ergonomic API over the raw protobuf types.

use crate::value::DynamicValue;

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: DynamicValue,
    /// Top-level attributes whose change forces the resource to be replaced.
    pub requires_replace: Vec<String>,
}

impl PlanResult {
    /// Create a plan result that updates in place.
    pub fn in_place(planned_state: DynamicValue) -> Self {
        Self {
            planned_state,
            requires_replace: Vec::new(),
        }
    }

    /// Create a plan result that replaces the resource because of `paths`.
    pub fn with_replacement(planned_state: DynamicValue, requires_replace: Vec<String>) -> Self {
        Self {
            planned_state,
            requires_replace,
        }
    }

    /// Whether applying this plan replaces the resource.
    pub fn replaces(&self) -> bool {
        !self.requires_replace.is_empty()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: DynamicValue,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: DynamicValue) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerCapabilities {
    /// Whether the provider wants `PlanResourceChange` calls for destroy.
    pub plan_destroy: bool,
    /// Whether Terraform may skip `GetProviderSchema` and use a cached schema.
    pub get_provider_schema_optional: bool,
}

/// go-plugin core protocol version, the first handshake field.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Terraform plugin protocol version, the second handshake field.
pub const PROTOCOL_VERSION: u32 = 6;

/// Environment variable Terraform sets to prove it launched the plugin.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Expected value of [`MAGIC_COOKIE_KEY`].
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";
