use magesoap_util::xml;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to read file")]
    FileReadError(#[source] std::io::Error),

    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Server responded with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("Error parsing XML input")]
    XmlParseError(#[from] xml::Error),

    #[error("Document root is not a WSDL definitions element")]
    NotAWsdl,

    #[error("Namespace prefix `{0}` is not bound")]
    UnboundPrefix(String),

    #[error("<{element}> is missing the `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
}
