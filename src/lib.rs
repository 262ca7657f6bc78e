//! Terraform provider for the Swagger Petstore API.
//!
//! The provider manages pets (`petstore_pet`) and looks up users
//! (`petstore_user`) through the Petstore v3 REST API. It speaks Terraform's
//! plugin protocol version 6 directly over gRPC.
//!
//! # Layout
//!
//! - [`provider`]: the `petstore` provider, its configuration and dispatch
//! - [`resources`] / [`data_sources`]: per-type controllers
//! - [`client`]: the Petstore HTTP client
//! - [`server`]: the [`ProviderService`] trait, the `tfplugin6` gRPC adapter
//!   and the go-plugin handshake
//! - [`schema`], [`value`], [`validation`]: Terraform schemas, dynamic values
//!   and config checks
//!
//! # Handshake Protocol
//!
//! Terraform starts the binary with `TF_PLUGIN_MAGIC_COOKIE` set and reads
//! a single line from its stdout:
//!
//! ```text
//! 1|6|tcp|127.0.0.1:50051|grpc|<base64 certificate or empty>
//! ```
//!
//! Format: `<core version>|<protocol version>|tcp|<address>|grpc|<cert>`.
//! When Terraform passes `PLUGIN_CLIENT_CERT`, the server listens with TLS
//! and `<cert>` is its self-signed certificate.
//!
//! # Example
//!
//! ```hcl
//! provider "petstore" {
//!   server = "http://localhost:8080/api/v3"
//! }
//!
//! resource "petstore_pet" "dog" {
//!   name     = "newdog"
//!   status   = "available"
//!   category = { id = 1, name = "dog" }
//! }
//!
//! data "petstore_user" "user" {
//!   username = "theUser"
//! }
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod tls;
pub mod types;
pub mod validation;
pub mod value;

#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::init_logging;
pub use provider::PetstoreProvider;
pub use schema::{Diagnostic, ProviderSchema};
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
pub use validation::validate;
pub use value::DynamicValue;
