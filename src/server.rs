//! Server helpers for running providers.
//!
//! This module provides the `ProviderService` trait that providers implement,
//! and the `serve` function that runs it as a Terraform plugin: it checks the
//! magic cookie, starts the `tfplugin6` gRPC server and prints the go-plugin
//! handshake line.
//!
//! # Signal Handling
//!
//! Signal handlers are installed before the handshake line is printed.
//! SIGINT is ignored, as go-plugin servers do: Terraform forwards Ctrl-C to
//! the whole process group and then stops providers over gRPC.
//! When SIGTERM is received, the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests to complete (with configurable timeout)
//! 3. Calls the provider's `stop()` method
//! 4. Exits cleanly

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as tfplugin6;
use crate::schema::{has_errors, Attribute, Block, Diagnostic, DiagnosticSeverity, NestingMode};
use crate::schema::{ProviderSchema, Schema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, CORE_PROTOCOL_VERSION, MAGIC_COOKIE_KEY,
    MAGIC_COOKIE_VALUE, PROTOCOL_VERSION,
};
use crate::validation::validate;
use crate::value::DynamicValue;

/// Trait that provider implementations must implement.
///
/// This provides a higher-level API than the raw gRPC trait: values arrive
/// decoded as [`DynamicValue`], and failures are plain [`ProviderError`]s
/// which the server reports to Terraform as diagnostics.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    /// By default, checks it against the provider schema.
    async fn validate_provider_config(
        &self,
        config: DynamicValue,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: DynamicValue) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    /// By default, checks it against the resource schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: DynamicValue,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource, &config))
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        let _ = (resource_type, version);
        // Default: no upgrade needed, return state as-is
        Ok(state)
    }

    /// Plan changes for a resource. `proposed_state` is null for a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<DynamicValue>,
        proposed_state: DynamicValue,
        config: DynamicValue,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError>;

    /// Read the current state of a resource.
    async fn read(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    /// By default, checks it against the data source schema.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: DynamicValue,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let data_source = schema
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))?;
        Ok(validate(data_source, &config))
    }

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }
}

// =============================================================================
// Protocol conversions
// =============================================================================

/// Decode a request value. Absent values are null; undecodable ones fail
/// the whole RPC.
fn decode_value(value: Option<tfplugin6::DynamicValue>) -> Result<DynamicValue, tonic::Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::Null);
    };
    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::from_msgpack(&value.msgpack)
    } else {
        DynamicValue::from_json_slice(&value.json)
    };
    decoded.map_err(|e| ProviderError::InvalidRequest(e.message()).into())
}

fn encode_value(value: &DynamicValue) -> Result<tfplugin6::DynamicValue, ProviderError> {
    Ok(tfplugin6::DynamicValue {
        msgpack: value.to_msgpack()?,
        json: Vec::new(),
    })
}

fn attribute_path(path: &str) -> tfplugin6::AttributePath {
    use tfplugin6::attribute_path::step::Selector;

    tfplugin6::AttributePath {
        steps: path
            .split('.')
            .enumerate()
            .map(|(i, segment)| {
                let selector = match segment.parse::<i64>() {
                    Ok(index) if i > 0 => Selector::ElementKeyInt(index),
                    _ => Selector::AttributeName(segment.to_string()),
                };
                tfplugin6::attribute_path::Step {
                    selector: Some(selector),
                }
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<tfplugin6::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| tfplugin6::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => tfplugin6::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => tfplugin6::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.as_deref().map(attribute_path),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<tfplugin6::Diagnostic> {
    diagnostics_to_proto(vec![err.to_diagnostic()])
}

fn schema_to_proto(schema: &Schema) -> tfplugin6::Schema {
    tfplugin6::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block, schema.version)),
    }
}

fn block_to_proto(block: &Block, version: i64) -> tfplugin6::schema::Block {
    tfplugin6::schema::Block {
        version,
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| attribute_to_proto(name, attr))
            .collect(),
        block_types: Vec::new(),
        description: block.description.clone().unwrap_or_default(),
        description_kind: tfplugin6::StringKind::Markdown as i32,
        deprecated: false,
    }
}

fn attribute_to_proto(name: &str, attr: &Attribute) -> tfplugin6::schema::Attribute {
    use tfplugin6::schema::object::NestingMode as ProtoNesting;

    let nested_type = attr.nested.as_ref().map(|nested| tfplugin6::schema::Object {
        attributes: nested
            .attributes
            .iter()
            .map(|(name, attr)| attribute_to_proto(name, attr))
            .collect(),
        nesting: match nested.nesting {
            NestingMode::Single => ProtoNesting::Single as i32,
            NestingMode::List => ProtoNesting::List as i32,
            NestingMode::Set => ProtoNesting::Set as i32,
            NestingMode::Map => ProtoNesting::Map as i32,
        },
        ..Default::default()
    });

    tfplugin6::schema::Attribute {
        name: name.to_string(),
        // The type is carried by `nested_type` for nested attributes.
        r#type: if nested_type.is_some() {
            Vec::new()
        } else {
            attr.attr_type.to_json_bytes()
        },
        nested_type,
        description: attr.description.clone().unwrap_or_default(),
        required: attr.flags.required,
        optional: attr.flags.optional,
        computed: attr.flags.computed,
        sensitive: attr.flags.sensitive,
        description_kind: tfplugin6::StringKind::Markdown as i32,
        deprecated: false,
    }
}

fn log_diagnostics(operation: &str, type_name: &str, diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        warn!(
            type_name,
            diagnostics = diagnostics.len(),
            "{} completed with errors",
            operation
        );
    } else {
        info!(type_name, "{} completed successfully", operation);
    }
}

/// Wrapper that implements the generated gRPC trait.
pub(crate) struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[tonic::async_trait]
impl<P: ProviderService> tfplugin6::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<tfplugin6::get_metadata::Request>,
    ) -> Result<tonic::Response<tfplugin6::get_metadata::Response>, tonic::Status> {
        debug!("GetMetadata called");
        let metadata = self.provider.metadata();
        info!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(tfplugin6::get_metadata::Response {
            server_capabilities: Some(tfplugin6::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
                get_provider_schema_optional: metadata.capabilities.get_provider_schema_optional,
                move_resource_state: false,
            }),
            diagnostics: vec![],
            data_sources: metadata
                .data_sources
                .into_iter()
                .map(|type_name| tfplugin6::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: metadata
                .resources
                .into_iter()
                .map(|type_name| tfplugin6::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_provider_schema")]
    async fn get_provider_schema(
        &self,
        _request: tonic::Request<tfplugin6::get_provider_schema::Request>,
    ) -> Result<tonic::Response<tfplugin6::get_provider_schema::Response>, tonic::Status> {
        debug!("GetProviderSchema called");
        let schema = self.provider.schema();
        let capabilities = self.provider.metadata().capabilities;
        info!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetProviderSchema completed"
        );
        Ok(tonic::Response::new(
            tfplugin6::get_provider_schema::Response {
                provider: Some(schema_to_proto(&schema.provider)),
                resource_schemas: schema
                    .resources
                    .iter()
                    .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                    .collect(),
                data_source_schemas: schema
                    .data_sources
                    .iter()
                    .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                    .collect(),
                diagnostics: vec![],
                provider_meta: None,
                server_capabilities: Some(tfplugin6::ServerCapabilities {
                    plan_destroy: capabilities.plan_destroy,
                    get_provider_schema_optional: capabilities.get_provider_schema_optional,
                    move_resource_state: false,
                }),
            },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<tfplugin6::validate_provider_config::Request>,
    ) -> Result<tonic::Response<tfplugin6::validate_provider_config::Response>, tonic::Status>
    {
        debug!("ValidateProviderConfig called");
        let config = decode_value(request.into_inner().config)?;

        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                log_diagnostics("ValidateProviderConfig", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            tfplugin6::validate_provider_config::Response { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<tfplugin6::validate_resource_config::Request>,
    ) -> Result<tonic::Response<tfplugin6::validate_resource_config::Response>, tonic::Status>
    {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ValidateResourceConfig called");
        let config = decode_value(req.config)?;

        let diagnostics = match self
            .provider
            .validate_resource_config(&req.type_name, config)
            .await
        {
            Ok(diagnostics) => {
                log_diagnostics("ValidateResourceConfig", &req.type_name, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            tfplugin6::validate_resource_config::Response { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_resource_config")]
    async fn validate_data_resource_config(
        &self,
        request: tonic::Request<tfplugin6::validate_data_resource_config::Request>,
    ) -> Result<tonic::Response<tfplugin6::validate_data_resource_config::Response>, tonic::Status>
    {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ValidateDataResourceConfig called");
        let config = decode_value(req.config)?;

        let diagnostics = match self
            .provider
            .validate_data_source_config(&req.type_name, config)
            .await
        {
            Ok(diagnostics) => {
                log_diagnostics("ValidateDataResourceConfig", &req.type_name, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ValidateDataResourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            tfplugin6::validate_data_resource_config::Response { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        request: tonic::Request<tfplugin6::upgrade_resource_state::Request>,
    ) -> Result<tonic::Response<tfplugin6::upgrade_resource_state::Response>, tonic::Status>
    {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, version = req.version, "UpgradeResourceState called");
        let raw = req.raw_state.map(|raw| raw.json).unwrap_or_default();
        let state = DynamicValue::from_json_slice(&raw)
            .map_err(|e| tonic::Status::from(ProviderError::InvalidRequest(e.message())))?;

        let result = match self
            .provider
            .upgrade_resource_state(&req.type_name, req.version, state)
            .await
        {
            Ok(upgraded) => encode_value(&upgraded),
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(upgraded_state) => {
                info!(type_name = %req.type_name, from_version = req.version, "UpgradeResourceState completed");
                tfplugin6::upgrade_resource_state::Response {
                    upgraded_state: Some(upgraded_state),
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, version = req.version, error = %e, "UpgradeResourceState failed");
                tfplugin6::upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.configure_provider")]
    async fn configure_provider(
        &self,
        request: tonic::Request<tfplugin6::configure_provider::Request>,
    ) -> Result<tonic::Response<tfplugin6::configure_provider::Response>, tonic::Status> {
        let req = request.into_inner();
        debug!(terraform_version = %req.terraform_version, "ConfigureProvider called");
        let config = decode_value(req.config)?;

        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                log_diagnostics("ConfigureProvider", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ConfigureProvider failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            tfplugin6::configure_provider::Response { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.read_resource")]
    async fn read_resource(
        &self,
        request: tonic::Request<tfplugin6::read_resource::Request>,
    ) -> Result<tonic::Response<tfplugin6::read_resource::Response>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ReadResource called");
        let current_state = decode_value(req.current_state)?;

        let result = match self.provider.read(&req.type_name, current_state).await {
            Ok(state) => encode_value(&state),
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(new_state) => {
                debug!(type_name = %req.type_name, "ReadResource completed successfully");
                tfplugin6::read_resource::Response {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                    private: req.private,
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ReadResource failed");
                tfplugin6::read_resource::Response {
                    new_state: None,
                    diagnostics: error_to_diagnostics(&e),
                    private: req.private,
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.plan_resource_change")]
    async fn plan_resource_change(
        &self,
        request: tonic::Request<tfplugin6::plan_resource_change::Request>,
    ) -> Result<tonic::Response<tfplugin6::plan_resource_change::Response>, tonic::Status> {
        let req = request.into_inner();
        let prior_state = decode_value(req.prior_state)?;
        let proposed_state = decode_value(req.proposed_new_state)?;
        let config = decode_value(req.config)?;

        let prior_state = (!prior_state.is_null()).then_some(prior_state);
        debug!(type_name = %req.type_name, is_create = prior_state.is_none(), "PlanResourceChange called");

        let result = match self
            .provider
            .plan(&req.type_name, prior_state, proposed_state, config)
            .await
        {
            Ok(plan) => encode_value(&plan.planned_state).map(|state| (state, plan.requires_replace)),
            Err(e) => Err(e),
        };

        let response = match result {
            Ok((planned_state, requires_replace)) => {
                info!(
                    type_name = %req.type_name,
                    requires_replace = ?requires_replace,
                    "PlanResourceChange completed"
                );
                tfplugin6::plan_resource_change::Response {
                    planned_state: Some(planned_state),
                    requires_replace: requires_replace.iter().map(|p| attribute_path(p)).collect(),
                    planned_private: req.prior_private,
                    diagnostics: vec![],
                    legacy_type_system: false,
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "PlanResourceChange failed");
                tfplugin6::plan_resource_change::Response {
                    diagnostics: error_to_diagnostics(&e),
                    ..Default::default()
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.apply_resource_change")]
    async fn apply_resource_change(
        &self,
        request: tonic::Request<tfplugin6::apply_resource_change::Request>,
    ) -> Result<tonic::Response<tfplugin6::apply_resource_change::Response>, tonic::Status> {
        let req = request.into_inner();
        let prior_state = decode_value(req.prior_state)?;
        let planned_state = decode_value(req.planned_state)?;
        let type_name = req.type_name.as_str();

        let result = if prior_state.is_null() {
            info!(type_name, "Create called");
            self.provider.create(type_name, planned_state).await
        } else if planned_state.is_null() {
            info!(type_name, "Delete called");
            self.provider
                .delete(type_name, prior_state)
                .await
                .map(|()| DynamicValue::Null)
        } else {
            info!(type_name, "Update called");
            self.provider
                .update(type_name, prior_state, planned_state)
                .await
        };

        let response = match result.and_then(|state| encode_value(&state)) {
            Ok(new_state) => {
                info!(type_name, "ApplyResourceChange completed successfully");
                tfplugin6::apply_resource_change::Response {
                    new_state: Some(new_state),
                    private: req.planned_private,
                    diagnostics: vec![],
                    legacy_type_system: false,
                }
            }
            Err(e) => {
                error!(type_name, error = %e, "ApplyResourceChange failed");
                tfplugin6::apply_resource_change::Response {
                    diagnostics: error_to_diagnostics(&e),
                    ..Default::default()
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<tfplugin6::import_resource_state::Request>,
    ) -> Result<tonic::Response<tfplugin6::import_resource_state::Response>, tonic::Status> {
        let req = request.into_inner();
        info!(type_name = %req.type_name, id = %req.id, "ImportResourceState called");

        let result = match self.provider.import_resource(&req.type_name, &req.id).await {
            Ok(imported) => imported
                .into_iter()
                .map(|r| -> Result<_, ProviderError> {
                    Ok(tfplugin6::import_resource_state::ImportedResource {
                        type_name: r.resource_type,
                        state: Some(encode_value(&r.state)?),
                        private: Vec::new(),
                    })
                })
                .collect::<Result<Vec<_>, ProviderError>>(),
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(imported_resources) => {
                info!(
                    type_name = %req.type_name,
                    id = %req.id,
                    imported_count = imported_resources.len(),
                    "ImportResourceState completed"
                );
                tfplugin6::import_resource_state::Response {
                    imported_resources,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, id = %req.id, error = %e, "ImportResourceState failed");
                tfplugin6::import_resource_state::Response {
                    imported_resources: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<tfplugin6::read_data_source::Request>,
    ) -> Result<tonic::Response<tfplugin6::read_data_source::Response>, tonic::Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ReadDataSource called");
        let config = decode_value(req.config)?;

        let result = match self.provider.read_data_source(&req.type_name, config).await {
            Ok(state) => encode_value(&state),
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(state) => {
                info!(type_name = %req.type_name, "ReadDataSource completed successfully");
                tfplugin6::read_data_source::Response {
                    state: Some(state),
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(type_name = %req.type_name, error = %e, "ReadDataSource failed");
                tfplugin6::read_data_source::Response {
                    state: None,
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, _request), name = "grpc.stop_provider")]
    async fn stop_provider(
        &self,
        _request: tonic::Request<tfplugin6::stop_provider::Request>,
    ) -> Result<tonic::Response<tfplugin6::stop_provider::Response>, tonic::Status> {
        info!("StopProvider called");
        let error = match self.provider.stop().await {
            Ok(()) => {
                info!("StopProvider completed successfully");
                String::new()
            }
            Err(e) => {
                error!(error = %e, "StopProvider failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(tfplugin6::stop_provider::Response {
            error,
        }))
    }
}

// =============================================================================
// Serving
// =============================================================================

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Timeout for graceful shutdown. After receiving a shutdown signal,
    /// the server will wait this long for in-flight requests to complete.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
    /// Address to listen on. Default: an ephemeral loopback port.
    pub address: SocketAddr,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            address: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the listen address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }
}

/// Whether `value` is the magic cookie Terraform sets for its plugins.
pub fn magic_cookie_matches(value: Option<&str>) -> bool {
    value == Some(MAGIC_COOKIE_VALUE)
}

/// The go-plugin handshake line: `core|protocol|tcp|addr|grpc|cert`.
///
/// `cert` is the server certificate DER in unpadded base64, empty when
/// serving without TLS.
pub fn handshake_line(addr: SocketAddr, cert: Option<&str>) -> String {
    format!(
        "{}|{}|tcp|{}|grpc|{}",
        CORE_PROTOCOL_VERSION,
        PROTOCOL_VERSION,
        addr,
        cert.unwrap_or_default()
    )
}

/// Shutdown trigger for the plugin process.
///
/// Only SIGTERM shuts the server down. Ctrl-C in a Terraform run reaches the
/// whole process group, and Terraform stops its providers itself, so SIGINT
/// is received and dropped. Off Unix the process runs until Terraform kills it.
struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignal {
    /// Installs the handlers. Must run before the handshake line is printed.
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::interrupt()) {
                Ok(mut sigint) => {
                    tokio::spawn(async move {
                        while sigint.recv().await.is_some() {
                            debug!("Ignoring SIGINT");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Failed to install SIGINT handler"),
            }

            let sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => Some(sigterm),
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    None
                }
            };
            Self { sigterm }
        }

        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Resolves on SIGTERM. Never resolves when no handler is installed.
    async fn recv(self) {
        #[cfg(unix)]
        {
            if let Some(mut sigterm) = self.sigterm {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown");
                return;
            }
        }

        std::future::pending::<()>().await
    }
}

/// Serve a provider implementation as a Terraform plugin.
///
/// This function:
/// 1. Checks the magic cookie, exiting with status 1 when it is missing
/// 2. Binds an ephemeral loopback port
/// 3. Generates a TLS certificate if Terraform asked for AutoMTLS
/// 4. Outputs the handshake line to stdout and starts the gRPC server
/// 5. Shuts down gracefully on SIGTERM, ignoring SIGINT
///
/// For custom configuration, use [`serve_with_options`].
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
///
/// See [`serve`] for details.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if !magic_cookie_matches(std::env::var(MAGIC_COOKIE_KEY).ok().as_deref()) {
        eprintln!(
            "This binary is a plugin. These are not meant to be executed directly.\n\
             Please execute the program that consumes these plugins, which will\n\
             load any plugins automatically"
        );
        std::process::exit(1);
    }

    let listener = TcpListener::bind(options.address).await?;
    let addr = listener.local_addr()?;

    let mut builder = Server::builder();
    let mut cert = None;
    if std::env::var_os(crate::tls::CLIENT_CERT_ENV_VAR).is_some() {
        let tls = crate::tls::generate()?;
        debug!("AutoMTLS requested, serving TLS");
        builder = builder.tls_config(tls.config)?;
        cert = Some(tls.cert_base64);
    }

    serve_on_listener(provider, builder, listener, addr, cert, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    mut builder: Server,
    listener: TcpListener,
    addr: SocketAddr,
    cert: Option<String>,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = ShutdownSignal::install();

    // stdout carries nothing but the handshake
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr, cert.as_deref()))?;
    stdout.flush()?;

    info!(address = %addr, tls = cert.is_some(), "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService::new(Arc::clone(&provider));
    let server = tfplugin6::provider_server::ProviderServer::new(grpc_service);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_future = builder.add_service(server).serve_with_incoming_shutdown(
        tokio_stream::wrappers::TcpListenerStream::new(listener),
        async {
            let _ = shutdown_rx.await;
        },
    );
    tokio::pin!(server_future);

    // The timeout only bounds draining in-flight requests after a signal.
    let result = tokio::select! {
        result = &mut server_future => result,
        _ = shutdown.recv() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(options.shutdown_timeout, &mut server_future).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        timeout = ?options.shutdown_timeout,
                        "Shutdown timeout exceeded, forcing shutdown"
                    );
                    Ok(())
                }
            }
        }
    };

    match result {
        Ok(()) => info!("Server shutdown complete"),
        Err(e) => {
            error!(error = %e, "Server error during shutdown");
            return Err(e.into());
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}
