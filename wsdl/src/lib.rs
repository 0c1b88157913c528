use magesoap_util::xml::Document;
use std::path::Path;
use url::Url;

mod fetch;
mod parser;
mod patch;

pub mod error;
pub mod types;

pub use fetch::fetch;
pub use patch::{patch, patch_document, MAP_NAMESPACE};

pub const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const WSDL_SOAP: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const WSDL_SOAP12: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// Accepts absolute URLs as well as local paths.
pub fn resolve_url<S: AsRef<str>>(location: S) -> Result<Url, error::Error> {
    match Url::parse(location.as_ref()) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::from_file_path(
            &Path::new(location.as_ref())
                .canonicalize()
                .map_err(|err| error::Error::PathConversionError(Some(err)))?,
        )
        .map_err(|()| error::Error::PathConversionError(None)),
        Err(err) => Err(err.into()),
    }
}

/// Fetches a WSDL and makes sure it declares the `Map` type.
pub fn fetch_patched<S: AsRef<str>>(location: S) -> Result<Vec<u8>, error::Error> {
    let wsdl = fetch(location)?;
    patch(&wsdl)
}

pub fn parse(wsdl: &[u8]) -> Result<types::Definition, error::Error> {
    let document = Document::parse(wsdl)?;
    parser::parse(&document)
}
