//! Error types for the Petstore provider.
//!
//! Every operation failure is reported to Terraform as a [`Diagnostic`]
//! whose summary names the error class and whose detail carries the
//! message. Requests that cannot even be decoded fail the RPC instead,
//! through the [`tonic::Status`] conversion.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while serving the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The Petstore API could not be reached.
    #[error("Client error: {0}")]
    Client(String),

    /// The Petstore API answered with an unexpected status or body.
    #[error("Server error: {0}")]
    Server(String),

    /// The requested remote object was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value did not have the expected shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider could not be configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource or data source operation arrived before `ConfigureProvider`.
    #[error("Provider not configured: {0}")]
    Unconfigured(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The operation is not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// A dynamic value could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A serde model did not match a dynamic value.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request from Terraform.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The AutoMTLS certificate could not be set up.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::Client(msg)
            | Self::Server(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::Unconfigured(msg)
            | Self::UnknownResource(msg)
            | Self::Unimplemented(msg)
            | Self::Encoding(msg)
            | Self::InvalidRequest(msg)
            | Self::Tls(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Transport(err) => err.to_string(),
        }
    }

    /// The diagnostic summary Terraform shows for this error.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Client(_) => "Client Error",
            Self::Server(_) => "Server Error",
            Self::NotFound(_) => "Not Found",
            Self::Validation(_) => "Invalid Attribute Value",
            Self::Configuration(_) => "Unable to Create Petstore API Client",
            Self::Unconfigured(_) => "Provider Not Configured",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Unimplemented(_) => "Unsupported Operation",
            Self::Encoding(_) | Self::Serialization(_) => "Invalid Dynamic Value",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Tls(_) => "TLS Setup Failed",
            Self::Transport(_) => "Transport Error",
        }
    }

    /// Convert into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.summary()).with_detail(self.message())
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        err.to_diagnostic()
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Client(msg) => tonic::Status::unavailable(msg),
            ProviderError::Server(msg) => tonic::Status::internal(msg),
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unconfigured(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::Encoding(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Tls(msg) => tonic::Status::internal(msg),
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            }
        }
    }
}
