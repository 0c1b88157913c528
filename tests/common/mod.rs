#![allow(dead_code)]

use bytes::Bytes;
use magesoap::{report::WsdlSource, Config};
use magesoap_util::{soap, xml::Document};
use std::{cell::RefCell, io::Write};
use tempfile::NamedTempFile;

pub const V1: &str = include_str!("../fixtures/magento_v1.wsdl");
pub const V2: &str = include_str!("../fixtures/magento_v2.wsdl");

/// One request as the server saw it: the operation and the text of each
/// part. Array parts list their items' text separated by commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: String,
    pub parts: Vec<String>,
}

/// Answers each request with whatever `handler` returns and remembers it.
pub struct ScriptedTransport<F> {
    handler: F,
    pub requests: RefCell<Vec<Request>>,
}

impl Request {
    /// The resource path of a V1 `call`.
    pub fn resource(&self) -> &str {
        self.parts.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn arg(&self, index: usize) -> &str {
        self.parts
            .get(2)
            .and_then(|args| args.split(',').nth(index))
            .unwrap_or_default()
    }
}

impl<F> ScriptedTransport<F>
where
    F: Fn(&Request) -> Result<String, soap::Error>,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            requests: RefCell::default(),
        }
    }

    pub fn count(&self, operation: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.operation == operation)
            .count()
    }

    pub fn resources(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.operation == "call")
            .map(|request| request.resource().to_owned())
            .collect()
    }
}

impl<F> soap::Transport for ScriptedTransport<F>
where
    F: Fn(&Request) -> Result<String, soap::Error>,
{
    fn post(&self, _url: &str, _action: &str, body: Vec<u8>) -> Result<Bytes, soap::Error> {
        let document = Document::parse(&body).expect("request is XML");
        let call = document
            .root
            .child("Body")
            .and_then(|body| body.child_elements().next())
            .expect("request has a body entry");

        let request = Request {
            operation: call.local_name().to_owned(),
            parts: call
                .child_elements()
                .map(|part| {
                    if part.has_child_elements() {
                        part.child_elements()
                            .map(|item| item.text_content())
                            .collect::<Vec<_>>()
                            .join(",")
                    } else {
                        part.text_content()
                    }
                })
                .collect(),
        };

        self.requests.borrow_mut().push(request.clone());
        (self.handler)(&request).map(Bytes::from)
    }
}

pub fn config() -> Config {
    Config {
        magento_domain: "https://shop.example.com".into(),
        api_user: "soap".into(),
        api_key: "secret".into(),
    }
}

pub fn wsdl_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temporary file");
    file.write_all(contents.as_bytes()).expect("write WSDL");
    file
}

pub fn source(file: &NamedTempFile, patch: bool) -> WsdlSource {
    WsdlSource {
        location: file.path().to_string_lossy().into_owned(),
        patch,
    }
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns1="urn:Magento" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/" xmlns:ns2="http://xml.apache.org/xml-soap" SOAP-ENV:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><SOAP-ENV:Body>{}</SOAP-ENV:Body></SOAP-ENV:Envelope>"#,
        body
    )
}

pub fn login_response() -> String {
    envelope(r#"<ns1:loginResponse><loginReturn xsi:type="xsd:string">d41d8cd98f00b204</loginReturn></ns1:loginResponse>"#)
}

pub fn end_session_response() -> String {
    envelope(r#"<ns1:endSessionResponse><endSessionReturn xsi:type="xsd:boolean">true</endSessionReturn></ns1:endSessionResponse>"#)
}

pub fn fault(code: &str, message: &str) -> String {
    envelope(&format!(
        "<SOAP-ENV:Fault><faultcode>{}</faultcode><faultstring>{}</faultstring></SOAP-ENV:Fault>",
        code, message
    ))
}

pub fn call_response(result: &str) -> String {
    envelope(&format!("<ns1:callResponse>{}</ns1:callResponse>", result))
}

pub fn response(operation: &str, result: &str) -> String {
    envelope(&format!(
        "<ns1:{op}Response>{}</ns1:{op}Response>",
        result,
        op = operation
    ))
}

/// A `key`/`value` entry of an apache `Map` holding a string.
pub fn pair(key: &str, value: &str) -> String {
    pair_raw(key, &format!(r#"<value xsi:type="xsd:string">{}</value>"#, value))
}

/// A `key`/`value` entry whose `value` element is given whole.
pub fn pair_raw(key: &str, value: &str) -> String {
    format!(r#"<item><key xsi:type="xsd:string">{}</key>{}</item>"#, key, value)
}

pub fn map(name: &str, pairs: &[String]) -> String {
    format!(r#"<{name} xsi:type="ns2:Map">{}</{name}>"#, pairs.concat(), name = name)
}

pub fn map_array(name: &str, maps: &[String]) -> String {
    format!(
        r#"<{name} SOAP-ENC:arrayType="ns2:Map[{len}]" xsi:type="SOAP-ENC:Array">{}</{name}>"#,
        maps.concat(),
        name = name,
        len = maps.len()
    )
}

/// A V2 entity array such as `catalogAttributeEntityArray`.
pub fn entity_array(name: &str, entity: &str, items: &[&[(&str, &str)]]) -> String {
    let len = items.len();
    let items: String = items
        .iter()
        .map(|fields| {
            let fields: String = fields
                .iter()
                .map(|(key, value)| format!(r#"<{key} xsi:type="xsd:string">{}</{key}>"#, value, key = key))
                .collect();
            format!(r#"<item xsi:type="ns1:{}">{}</item>"#, entity, fields)
        })
        .collect();

    format!(
        r#"<{name} SOAP-ENC:arrayType="ns1:{entity}[{len}]" xsi:type="ns1:{entity}Array">{}</{name}>"#,
        items,
        name = name,
        entity = entity,
        len = len
    )
}
