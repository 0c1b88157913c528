//! Reports over the Magento SOAP API (attribute sets and attributes,
//! categories and their attributes, products, stores) read through a
//! session-scoped rpc/encoded client.

mod decode;
mod error;

pub mod client;
pub mod config;
pub mod flatten;
pub mod render;
pub mod report;
pub mod value;

pub use client::{ClientOptions, Session, SoapClient};
pub use config::{ApiVersion, Config};
pub use error::{describe, Error};
pub use value::Value;

pub use magesoap_util::soap::{HttpTransport, Param, Transport};
