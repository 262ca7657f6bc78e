//! The `petstore` provider: configuration and dispatch to controllers.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::PetstoreClient;
use crate::config::{self, SERVER_ENV_VAR};
use crate::data_sources::user::UserDataSource;
use crate::data_sources::DataSource;
use crate::error::ProviderError;
use crate::resources::pet::PetResource;
use crate::resources::{plan_change, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::value::DynamicValue;

/// Provider type name, the prefix of every resource type.
pub const PROVIDER_TYPE_NAME: &str = "petstore";

/// Controllers built by `ConfigureProvider`, sharing one API client.
struct Configured {
    pet: PetResource,
    user: UserDataSource,
}

/// The Petstore provider.
pub struct PetstoreProvider {
    version: String,
    configured: RwLock<Option<Arc<Configured>>>,
}

impl PetstoreProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            configured: RwLock::new(None),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Configure against an explicit `PETSTORE_SERVER` value instead of
    /// the process environment.
    pub async fn configure_with_env(
        &self,
        config: &DynamicValue,
        env: Option<String>,
    ) -> Vec<Diagnostic> {
        let server = match config::resolve_server(config, env) {
            Ok(server) => server,
            Err(diagnostic) => return vec![diagnostic],
        };

        let client = match PetstoreClient::new(&server) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                return vec![Diagnostic::error("Unable to Create Petstore API Client")
                    .with_detail(format!(
                        "An unexpected error occurred when creating the Petstore API client. \
                         If the error is not clear, please contact the provider developers.\n\n\
                         Petstore Client Error: {}",
                        e.message()
                    ))
                    .with_attribute("server")]
            }
        };

        let configured = Arc::new(Configured {
            pet: PetResource::new(Arc::clone(&client)),
            user: UserDataSource::new(client),
        });
        *self.configured.write().await = Some(configured);

        info!(server = %server, "Configured Petstore client");
        vec![]
    }

    async fn configured(&self, type_name: &str) -> Result<Arc<Configured>, ProviderError> {
        self.configured.read().await.clone().ok_or_else(|| {
            ProviderError::Unconfigured(format!(
                "{} was used before the provider was configured",
                type_name
            ))
        })
    }

    async fn pet(&self, resource_type: &str) -> Result<Arc<Configured>, ProviderError> {
        if resource_type != PetResource::type_name() {
            return Err(ProviderError::UnknownResource(resource_type.to_string()));
        }
        self.configured(resource_type).await
    }
}

#[async_trait::async_trait]
impl ProviderService for PetstoreProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(config::provider_schema())
            .with_resource(PetResource::type_name(), PetResource::schema())
            .with_data_source(UserDataSource::type_name(), UserDataSource::schema())
    }

    async fn configure(&self, config: DynamicValue) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!(version = %self.version, "Configuring Petstore provider");
        Ok(self
            .configure_with_env(&config, std::env::var(SERVER_ENV_VAR).ok())
            .await)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<DynamicValue>,
        proposed_state: DynamicValue,
        _config: DynamicValue,
    ) -> Result<PlanResult, ProviderError> {
        if resource_type != PetResource::type_name() {
            return Err(ProviderError::UnknownResource(resource_type.to_string()));
        }
        Ok(plan_change(
            &PetResource::schema(),
            prior_state.as_ref(),
            proposed_state,
        ))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.pet(resource_type).await?.pet.create(&planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.pet(resource_type).await?.pet.read(&current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        self.pet(resource_type)
            .await?
            .pet
            .update(&prior_state, &planned_state)
            .await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: DynamicValue,
    ) -> Result<(), ProviderError> {
        self.pet(resource_type).await?.pet.delete(&current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let state = self.pet(resource_type).await?.pet.import(id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        if data_source_type != UserDataSource::type_name() {
            return Err(ProviderError::UnknownResource(data_source_type.to_string()));
        }
        self.configured(data_source_type)
            .await?
            .user
            .read(&config)
            .await
    }
}
