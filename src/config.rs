//! Provider configuration.
//!
//! The provider block has a single `server` attribute naming the Petstore
//! API root. When it is left out, the `PETSTORE_SERVER` environment
//! variable is used instead.

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::DynamicValue;

/// Environment variable consulted when `server` is not configured.
pub const SERVER_ENV_VAR: &str = "PETSTORE_SERVER";

const UNKNOWN_HOST_SUMMARY: &str = "Unknown Petstore API Host";

const UNKNOWN_HOST_DETAIL: &str = "The provider cannot create the Petstore API client as there is an \
    unknown configuration value for the Petstore API host. Either target apply the source of the \
    value first, set the value statically in the configuration, or use the PETSTORE_SERVER \
    environment variable.";

/// Schema of the `provider "petstore"` block.
pub fn provider_schema() -> Schema {
    Schema::v0().with_attribute(
        "server",
        Attribute::optional_string().with_description("the petstore server"),
    )
}

/// Resolve the API server from provider configuration, falling back to
/// `env` (the value of [`SERVER_ENV_VAR`]).
///
/// Fails with an attribute diagnostic on `server` when the configured value
/// is unknown, or when neither source yields a non-empty address.
pub fn resolve_server(config: &DynamicValue, env: Option<String>) -> Result<String, Diagnostic> {
    let unknown_host = || {
        Diagnostic::error(UNKNOWN_HOST_SUMMARY)
            .with_detail(UNKNOWN_HOST_DETAIL)
            .with_attribute("server")
    };

    let server = match config.get("server") {
        Some(DynamicValue::Unknown) => return Err(unknown_host()),
        Some(DynamicValue::String(server)) => server.clone(),
        _ => env.unwrap_or_default(),
    };

    if server.is_empty() {
        return Err(unknown_host());
    }
    Ok(server)
}
