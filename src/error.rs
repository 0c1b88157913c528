use magesoap_util::soap::{self, Fault};
use std::path::PathBuf;
use thiserror::Error;

use crate::value::Shape;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to read configuration file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse configuration file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration value `{0}` is missing or empty")]
    ConfigMissing(&'static str),

    #[error("Unable to build WSDL URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to load WSDL")]
    WsdlError(#[from] magesoap_wsdl::error::Error),

    #[error("SOAP request failed")]
    SoapError(#[from] soap::Error),

    #[error("WSDL references undeclared types: {}", .0.join(", "))]
    UnresolvedTypes(Vec<String>),

    #[error("WSDL does not declare a SOAP endpoint")]
    NoEndpoint,

    #[error("WSDL does not declare operation `{0}`")]
    UnknownOperation(String),

    #[error("Operation `{operation}` takes {expected} arguments, {given} given")]
    ArgumentCount {
        operation: String,
        expected: usize,
        given: usize,
    },

    #[error("Remote fault: {0}")]
    Fault(Fault),

    #[error("Login rejected: {0}")]
    AuthError(Fault),

    #[error("Remote call `{operation}` failed")]
    RpcError {
        operation: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Response uses undeclared type {0}")]
    UnknownType(String),

    #[error("Response exceeds the document size or nesting limit")]
    DocumentTooLarge,

    #[error("Category tree for root `{0}` is empty")]
    EmptyCategoryTree(String),

    #[error("Response has an unexpected shape")]
    ShapeError(#[from] Shape),

    #[error("Unable to serialize response")]
    JsonError(#[from] serde_json::Error),

    #[error("Unable to write output")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Wraps a failure of one remote procedure with the procedure's name.
    pub(crate) fn rpc<S: Into<String>>(operation: S, source: Error) -> Self {
        Error::RpcError {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

/// The error and each of its sources, joined with `: `.
pub fn describe(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text
}
