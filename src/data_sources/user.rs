//! `petstore_user` data source: looks a user up by username.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::DataSource;
use crate::client::{PetstoreClient, User};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::value::DynamicValue;

/// Terraform state of a user lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub username: Option<String>,
    pub id: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<i64>,
}

impl UserModel {
    fn apply_user(&mut self, user: &User) {
        self.id = user.id.map(|id| id.to_string());
        self.password = user.password.clone();
        self.firstname = user.first_name.clone();
        self.lastname = user.last_name.clone();
        self.email = user.email.clone();
        self.phone = user.phone.clone();
        self.status = user.user_status.map(i64::from);
    }
}

/// Controller for `petstore_user`.
pub struct UserDataSource {
    client: Arc<PetstoreClient>,
}

impl UserDataSource {
    pub fn new(client: Arc<PetstoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl DataSource for UserDataSource {
    fn type_name() -> &'static str {
        "petstore_user"
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("User data source")
            .with_attribute(
                "username",
                Attribute::required_string().with_description("User name to look up"),
            )
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("User identifier"),
            )
            .with_attribute(
                "password",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("User password"),
            )
            .with_attribute(
                "firstname",
                Attribute::computed_string().with_description("First name"),
            )
            .with_attribute(
                "lastname",
                Attribute::computed_string().with_description("Last name"),
            )
            .with_attribute("email", Attribute::computed_string().with_description("Email"))
            .with_attribute("phone", Attribute::computed_string().with_description("Phone"))
            .with_attribute(
                "status",
                Attribute::computed_int64().with_description("User status"),
            )
    }

    async fn read(&self, config: &DynamicValue) -> Result<DynamicValue, ProviderError> {
        let mut data: UserModel = config.decode()?;
        let username = data
            .username
            .clone()
            .ok_or_else(|| ProviderError::Validation("username must be set".to_string()))?;

        let resp = self
            .client
            .get_user_by_name(&username)
            .await
            .map_err(|e| ProviderError::Client(format!("Unable to get users: {}", e)))?;
        // the body carries the password
        trace!(status = resp.status, url = %resp.url, "get users and got a http response");

        let not_found = || ProviderError::NotFound(format!("User with name {} not found.", username));
        if resp.status == 404 {
            return Err(not_found());
        }
        if !resp.is_ok() {
            return Err(ProviderError::Server(format!(
                "Unable to get users, got status code: {}",
                resp.status
            )));
        }
        let user = resp.json.ok_or_else(not_found)?;

        data.apply_user(&user);
        trace!(id = ?data.id, "read a user data source");
        DynamicValue::encode(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_user() {
        let mut data = UserModel {
            username: Some("theUser".into()),
            ..Default::default()
        };
        data.apply_user(&User {
            id: Some(10),
            username: Some("theUser".into()),
            first_name: Some("John".into()),
            last_name: Some("James".into()),
            email: Some("john@email.com".into()),
            password: Some("12345".into()),
            phone: Some("12345".into()),
            user_status: Some(1),
        });

        assert_eq!(data.id.as_deref(), Some("10"));
        assert_eq!(data.firstname.as_deref(), Some("John"));
        assert_eq!(data.lastname.as_deref(), Some("James"));
        assert_eq!(data.status, Some(1));
        assert_eq!(data.username.as_deref(), Some("theUser"));
    }

    #[test]
    fn test_schema_shape() {
        let schema = UserDataSource::schema();
        let attrs = &schema.block.attributes;
        assert!(attrs["username"].flags.required);
        assert!(attrs["password"].flags.sensitive);
        assert!(attrs
            .iter()
            .filter(|(name, _)| name.as_str() != "username")
            .all(|(_, attr)| attr.flags.is_computed_only()));

        let state = DynamicValue::encode(&UserModel::default()).unwrap();
        assert_eq!(state.as_object().unwrap().len(), attrs.len());
    }
}
