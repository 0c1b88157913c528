use super::xml::{self, Document, Element, Scope};

use bytes::Bytes;
use reqwest::{blocking::Client as Reqwest, header::CONTENT_TYPE, StatusCode};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub const SOAP_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const XML_SCHEMA: &str = "http://www.w3.org/2001/XMLSchema";
pub const XML_SCHEMA_INSTANCE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const APACHE_SOAP: &str = "http://xml.apache.org/xml-soap";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to send request")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Server responded with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Unable to process XML")]
    XmlError(#[from] xml::Error),

    #[error("Response is not a SOAP envelope")]
    NotAnEnvelope,

    #[error("Response envelope has no body entry")]
    EmptyBody,
}

/// Carries a serialized envelope to an endpoint and returns the raw response.
pub trait Transport {
    fn post(&self, url: &str, action: &str, body: Vec<u8>) -> Result<Bytes, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, action: &str, body: Vec<u8>) -> Result<Bytes, Error> {
        (**self).post(url, action, body)
    }
}

pub struct HttpTransport {
    client: Reqwest,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Reqwest::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, action: &str, body: Vec<u8>) -> Result<Bytes, Error> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", action))
            .body(body)
            .send()?;

        let status = response.status();
        debug!(%status, url, "received SOAP response");

        // Faults travel with a 500 status and still need to be read.
        if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR {
            Ok(response.bytes()?)
        } else {
            Err(Error::HttpStatus(status.as_u16()))
        }
    }
}

/// A SOAP-encoded argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Nil,
    String(String),
    Array(Vec<Param>),
    Map(Vec<(String, Param)>),
}

/// An rpc/encoded request: one operation element carrying its parts.
#[derive(Debug, Clone)]
pub struct Envelope {
    namespace: String,
    operation: String,
    parts: Vec<(String, Param)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Response {
    document: Document,
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::String(value.to_owned())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::String(value)
    }
}

impl From<Vec<Param>> for Param {
    fn from(items: Vec<Param>) -> Self {
        Param::Array(items)
    }
}

impl Param {
    fn to_element(&self, name: &str) -> Element {
        let element = Element::new(name);

        match self {
            Param::Nil => element.with_attribute("xsi:nil", "true"),

            Param::String(value) => element
                .with_attribute("xsi:type", "xsd:string")
                .with_text(value.as_str()),

            Param::Array(items) => items.iter().fold(
                element
                    .with_attribute("SOAP-ENC:arrayType", format!("xsd:ur-type[{}]", items.len()))
                    .with_attribute("xsi:type", "SOAP-ENC:Array"),
                |array, item| array.with_child(item.to_element("item")),
            ),

            Param::Map(entries) => entries.iter().fold(
                element.with_attribute("xsi:type", "apache:Map"),
                |map, (key, value)| {
                    map.with_child(
                        Element::new("item")
                            .with_child(Param::from(key.as_str()).to_element("key"))
                            .with_child(value.to_element("value")),
                    )
                },
            ),
        }
    }
}

impl Envelope {
    pub fn new<N: Into<String>, O: Into<String>>(namespace: N, operation: O) -> Self {
        Self {
            namespace: namespace.into(),
            operation: operation.into(),
            parts: Vec::new(),
        }
    }

    pub fn part<N: Into<String>, P: Into<Param>>(mut self, name: N, value: P) -> Self {
        self.parts.push((name.into(), value.into()));
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn to_request(&self) -> Result<Vec<u8>, Error> {
        let call = self.parts.iter().fold(
            Element::new(format!("ns1:{}", self.operation)),
            |call, (name, value)| call.with_child(value.to_element(name)),
        );

        let envelope = Element::new("SOAP-ENV:Envelope")
            .with_attribute("xmlns:SOAP-ENV", SOAP_ENVELOPE)
            .with_attribute("xmlns:ns1", self.namespace.as_str())
            .with_attribute("xmlns:xsd", XML_SCHEMA)
            .with_attribute("xmlns:xsi", XML_SCHEMA_INSTANCE)
            .with_attribute("xmlns:SOAP-ENC", SOAP_ENCODING)
            .with_attribute("xmlns:apache", APACHE_SOAP)
            .with_attribute("SOAP-ENV:encodingStyle", SOAP_ENCODING)
            .with_child(Element::new("SOAP-ENV:Body").with_child(call));

        Ok(Document::new(envelope).to_bytes()?)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (fault code {})", self.message, self.code)
    }
}

impl Response {
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let document = Document::parse(body)?;
        let scope = Scope::default().enter(&document.root);

        if !document.root.is(&scope, SOAP_ENVELOPE, "Envelope") {
            return Err(Error::NotAnEnvelope);
        }

        Ok(Self { document })
    }

    /// The `Body` element together with the scope in effect inside it.
    fn body(&self) -> Result<(&Element, Scope), Error> {
        let scope = Scope::default().enter(&self.document.root);

        self.document
            .root
            .child_elements()
            .map(|element| (element, scope.enter(element)))
            .find(|(element, scope)| element.is(scope, SOAP_ENVELOPE, "Body"))
            .ok_or(Error::NotAnEnvelope)
    }

    pub fn fault(&self) -> Option<Fault> {
        let (body, scope) = self.body().ok()?;
        let fault = body.child_elements().find(|element| {
            let scope = scope.enter(element);
            element.is(&scope, SOAP_ENVELOPE, "Fault")
        })?;

        let text = |name: &str| {
            fault
                .child(name)
                .map(|element| element.text_content().trim().to_owned())
                .unwrap_or_default()
        };

        Some(Fault {
            code: text("faultcode"),
            message: text("faultstring"),
        })
    }

    /// The first element inside `Body`, e.g. `<ns1:loginResponse>`, with the
    /// scope of its parent.
    pub fn body_entry(&self) -> Result<(&Element, Scope), Error> {
        let (body, scope) = self.body()?;
        let entry = body.child_elements().next().ok_or(Error::EmptyBody)?;
        Ok((entry, scope))
    }
}
