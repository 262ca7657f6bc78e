//! `petstore_pet` resource.
//!
//! The pet id is server-assigned. Create seeds the request with a random
//! placeholder id which the response always overwrites. Only `name` and
//! `status` can change in place; the update endpoint has no way to touch
//! the rest, so those attributes force a replacement.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Resource;
use crate::client::{self, PetStatus, PetstoreClient, UpdatePetWithFormParams};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::value::DynamicValue;

/// Terraform state of a pet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<CategoryModel>,
    pub tags: Option<Vec<TagModel>>,
    pub photo_urls: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryModel {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagModel {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl PetModel {
    /// API payload carrying everything set in the model except the id.
    fn to_api(&self) -> client::Pet {
        client::Pet {
            id: None,
            name: self.name.clone().unwrap_or_default(),
            category: self.category.as_ref().map(|c| client::Category {
                id: c.id,
                name: c.name.clone(),
            }),
            photo_urls: self.photo_urls.clone().unwrap_or_default(),
            tags: self.tags.as_ref().map(|tags| {
                tags.iter()
                    .map(|t| client::Tag {
                        id: t.id,
                        name: t.name.clone(),
                    })
                    .collect()
            }),
            status: self.status.as_deref().map(PetStatus::from),
        }
    }

    /// Overwrite the model with what the server reported.
    ///
    /// Empty tag and photo lists, and statuses outside the documented set,
    /// leave the current values in place.
    fn apply_response(&mut self, pet: &client::Pet) {
        if let Some(id) = pet.id {
            self.id = Some(id.to_string());
        }

        if let Some(category) = &pet.category {
            self.category = Some(CategoryModel {
                id: category.id,
                name: category.name.clone(),
            });
        }

        if let Some(tags) = pet.tags.as_ref().filter(|tags| !tags.is_empty()) {
            self.tags = Some(
                tags.iter()
                    .map(|t| TagModel {
                        id: t.id,
                        name: t.name.clone(),
                    })
                    .collect(),
            );
        }

        if !pet.photo_urls.is_empty() {
            self.photo_urls = Some(pet.photo_urls.clone());
        }

        match &pet.status {
            Some(status @ (PetStatus::Available | PetStatus::Pending | PetStatus::Sold)) => {
                self.status = Some(status.as_str().to_string());
            }
            Some(PetStatus::Other(_)) | None => {}
        }
    }

    fn pet_id(&self) -> Result<i64, ProviderError> {
        let id = self.id.as_deref().unwrap_or_default();
        id.parse().map_err(|e| {
            ProviderError::Validation(format!("Unable to parse pet id {:?}: {}", id, e))
        })
    }
}

/// Controller for `petstore_pet`.
pub struct PetResource {
    client: Arc<PetstoreClient>,
}

impl PetResource {
    pub fn new(client: Arc<PetstoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Resource for PetResource {
    fn type_name() -> &'static str {
        "petstore_pet"
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Pet resource")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Pet identifier"),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Pet name"),
            )
            .with_attribute(
                "category",
                Attribute::single_nested(
                    [
                        (
                            "id",
                            Attribute::required_int64().with_description("Category identifier"),
                        ),
                        (
                            "name",
                            Attribute::required_string().with_description("Category name"),
                        ),
                    ],
                    AttributeFlags::required(),
                )
                .with_description("Pet category")
                .with_force_new(),
            )
            .with_attribute(
                "tags",
                Attribute::list_nested(
                    [
                        (
                            "id",
                            Attribute::optional_int64().with_description("Tag identifier"),
                        ),
                        (
                            "name",
                            Attribute::optional_string().with_description("Tag name"),
                        ),
                    ],
                    AttributeFlags::optional(),
                )
                .with_description("Pet tags")
                .with_force_new(),
            )
            .with_attribute(
                "photo_urls",
                Attribute::optional_list(AttributeType::String)
                    .with_description("Pet photo URLs")
                    .with_force_new(),
            )
            .with_attribute(
                "status",
                Attribute::required_string()
                    .with_description("Pet status: `available`, `pending` or `sold`"),
            )
    }

    async fn create(&self, planned: &DynamicValue) -> Result<DynamicValue, ProviderError> {
        let mut state: PetModel = planned.decode()?;
        trace!(plan = ?state, "output pet plan");

        let mut params = state.to_api();
        let placeholder = rand::thread_rng().gen_range(0..1000);
        trace!(id = placeholder, "generated pet id");
        params.id = Some(placeholder);
        trace!(?params, "output pet params for create");

        let resp = self.client.add_pet(&params).await.map_err(|e| {
            ProviderError::Client(format!("Unable to create pet, got error: {}", e))
        })?;
        trace!(status = resp.status, url = %resp.url, body = %resp.body, "create pet and got a http response");

        let pet = resp.json.ok_or_else(|| {
            ProviderError::Server(format!(
                "Unable to create pet, got status code: {}",
                resp.status
            ))
        })?;
        if pet.id.is_none() {
            return Err(ProviderError::Server(
                "Unable to create pet, the response carried no id".to_string(),
            ));
        }

        state.apply_response(&pet);
        trace!(id = ?state.id, "created a resource");
        DynamicValue::encode(&state)
    }

    async fn read(&self, current: &DynamicValue) -> Result<DynamicValue, ProviderError> {
        let mut state: PetModel = current.decode()?;
        let pet_id = state.pet_id()?;
        trace!(id = pet_id, "use pet id");

        let resp = self.client.get_pet_by_id(pet_id).await.map_err(|e| {
            ProviderError::Client(format!("Unable to read pet, got error: {}", e))
        })?;
        trace!(status = resp.status, url = %resp.url, body = %resp.body, "read a pet and got a http response");

        let pet = resp.json.ok_or_else(|| {
            ProviderError::Server(format!(
                "Unable to read pet, got status code: {}",
                resp.status
            ))
        })?;

        state.name = Some(pet.name.clone());
        state.apply_response(&pet);
        trace!("read a resource");
        DynamicValue::encode(&state)
    }

    async fn update(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, ProviderError> {
        let mut state: PetModel = planned.decode()?;
        let prior: PetModel = prior.decode()?;

        let mut params = UpdatePetWithFormParams::default();
        if state.name.is_some() && state.name != prior.name {
            params.name = state.name.clone();
        }
        if state.status.is_some() && state.status != prior.status {
            params.status = state.status.clone();
        }
        // The endpoint wants a name alongside any status change.
        if params.name.is_none() && params.status.is_some() {
            params.name = prior.name.clone();
        }

        if params.is_empty() {
            trace!("no update params");
            return Ok(planned.clone());
        }
        trace!(?params, "output pet params for update");

        let pet_id = prior.pet_id()?;
        trace!(id = pet_id, "use pet id");

        let resp = self
            .client
            .update_pet_with_form(pet_id, &params)
            .await
            .map_err(|e| ProviderError::Client(format!("Unable to update pet, got error: {}", e)))?;
        trace!(status = resp.status, url = %resp.url, body = %resp.body, "update a pet and got a http response");

        let pet = resp.json.ok_or_else(|| {
            ProviderError::Server(format!(
                "Unable to update pet, got status code: {}",
                resp.status
            ))
        })?;

        state.id = prior.id;
        state.name = Some(pet.name.clone());
        state.apply_response(&pet);
        trace!("updated a resource");
        DynamicValue::encode(&state)
    }

    async fn delete(&self, current: &DynamicValue) -> Result<(), ProviderError> {
        let state: PetModel = current.decode()?;
        let pet_id = state.pet_id()?;
        trace!(id = pet_id, "use pet id");

        let resp = self.client.delete_pet(pet_id).await.map_err(|e| {
            ProviderError::Client(format!("Unable to delete pet, got error: {}", e))
        })?;
        trace!(status = resp.status, url = %resp.url, body = %resp.body, "delete a pet and got a http response");

        if !resp.is_ok() {
            return Err(ProviderError::Server(format!(
                "Unable to delete pet, got status code: {}",
                resp.status
            )));
        }
        Ok(())
    }

    async fn import(&self, id: &str) -> Result<DynamicValue, ProviderError> {
        DynamicValue::encode(&PetModel {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }
}
