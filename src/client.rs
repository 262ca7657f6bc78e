//! Petstore API client
//!
//! Typed access to the Petstore v3 endpoints the provider uses. Every call
//! resolves to an [`ApiResponse`] as long as the server answered at all;
//! only transport failures surface as errors, so callers decide what each
//! status code means for them.

use std::fmt;

use reqwest::Url;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Pet in the store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PetStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Pet status in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStatus {
    Available,
    Pending,
    Sold,
    /// A status outside the documented set, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl PetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PetStatus::Available => "available",
            PetStatus::Pending => "pending",
            PetStatus::Sold => "sold",
            PetStatus::Other(s) => s,
        }
    }
}

impl From<&str> for PetStatus {
    fn from(s: &str) -> Self {
        match s {
            "available" => PetStatus::Available,
            "pending" => PetStatus::Pending,
            "sold" => PetStatus::Sold,
            other => PetStatus::Other(other.to_string()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    /// User Status
    pub user_status: Option<i32>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("phone", &self.phone)
            .field("user_status", &self.user_status)
            .finish()
    }
}

/// Form parameters of `POST /pet/{petId}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdatePetWithFormParams {
    pub name: Option<String>,
    pub status: Option<String>,
}

impl UpdatePetWithFormParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none()
    }
}

/// An HTTP response from the Petstore API.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    /// Final request URL, for logging.
    pub url: String,
    pub body: String,
    /// Decoded body of a `200 OK` response; `None` for any other status or
    /// a body that does not decode.
    pub json: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Client for the Petstore HTTP API.
#[derive(Debug, Clone)]
pub struct PetstoreClient {
    http: reqwest::Client,
    base: Url,
}

impl PetstoreClient {
    /// Create a client for the API rooted at `server`,
    /// e.g. `https://petstore3.swagger.io/api/v3`.
    pub fn new(server: &str) -> Result<Self, ProviderError> {
        let base = Url::parse(server).map_err(|e| {
            ProviderError::Configuration(format!("invalid server URL {:?}: {}", server, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(ProviderError::Configuration(format!(
                "server URL {:?} cannot carry API paths",
                server
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self { http, base })
    }

    /// Add a new pet to the store
    pub async fn add_pet(&self, pet: &Pet) -> Result<ApiResponse<Pet>, reqwest::Error> {
        let request = self.http.post(self.endpoint(&["pet"])).json(pet);
        self.execute(request).await
    }

    /// Find pet by ID
    pub async fn get_pet_by_id(&self, pet_id: i64) -> Result<ApiResponse<Pet>, reqwest::Error> {
        let request = self.http.get(self.endpoint(&["pet", &pet_id.to_string()]));
        self.execute(request).await
    }

    /// Updates a pet in the store with form data
    pub async fn update_pet_with_form(
        &self,
        pet_id: i64,
        params: &UpdatePetWithFormParams,
    ) -> Result<ApiResponse<Pet>, reqwest::Error> {
        let mut query = Vec::new();
        if let Some(name) = &params.name {
            query.push(("name", name.as_str()));
        }
        if let Some(status) = &params.status {
            query.push(("status", status.as_str()));
        }

        let request = self
            .http
            .post(self.endpoint(&["pet", &pet_id.to_string()]))
            .query(&query);
        self.execute(request).await
    }

    /// Deletes a pet
    pub async fn delete_pet(&self, pet_id: i64) -> Result<ApiResponse<IgnoredAny>, reqwest::Error> {
        let request = self.http.delete(self.endpoint(&["pet", &pet_id.to_string()]));
        self.execute(request).await
    }

    /// Get user by user name
    pub async fn get_user_by_name(
        &self,
        username: &str,
    ) -> Result<ApiResponse<User>, reqwest::Error> {
        let request = self.http.get(self.endpoint(&["user", username]));
        self.execute(request).await
    }

    /// Base URL extended with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so this always applies.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>, reqwest::Error> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        let json = if status == 200 {
            serde_json::from_str(&body).ok()
        } else {
            None
        };

        Ok(ApiResponse {
            status,
            url,
            body,
            json,
        })
    }
}
