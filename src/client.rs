use magesoap_util::{
    soap::{self, Envelope, Param, Response, Transport},
    xml,
};
use magesoap_wsdl::types::Definition;
use std::mem;
use tracing::{debug, info, warn};

use crate::{decode::Decoder, error::describe, value::Value, Error};

/// Response size allowed without the large-document allowance.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Reject responses typed with anything the WSDL does not declare.
    pub strict: bool,
    /// Lift the response size limit and raise the nesting limit to
    /// [`xml::MAX_DEPTH`].
    pub huge_tree: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            strict: false,
            huge_tree: true,
        }
    }
}

/// An rpc/encoded client bound to the first SOAP port a WSDL declares.
pub struct SoapClient<T: Transport> {
    definition: Definition,
    endpoint: String,
    transport: T,
    options: ClientOptions,
}

/// A logged-in session. `endSession` is sent exactly once, when the session
/// is closed or dropped.
pub struct Session<'a, T: Transport> {
    client: &'a SoapClient<T>,
    id: String,
    closed: bool,
}

impl<T: Transport> SoapClient<T> {
    pub fn new(wsdl: &[u8], transport: T, options: ClientOptions) -> Result<Self, Error> {
        let definition = magesoap_wsdl::parse(wsdl)?;

        let unresolved = definition.unresolved_types();
        if !unresolved.is_empty() {
            return Err(Error::UnresolvedTypes(unresolved));
        }

        let endpoint = definition.endpoint().ok_or(Error::NoEndpoint)?.to_owned();
        debug!(%endpoint, "built SOAP client");

        Ok(Self {
            definition,
            endpoint,
            transport,
            options,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn invoke(&self, operation: &str, params: Vec<Param>) -> Result<Value, Error> {
        let info = self
            .definition
            .operation(operation)
            .ok_or_else(|| Error::UnknownOperation(operation.to_owned()))?;

        if info.parts.len() != params.len() {
            return Err(Error::ArgumentCount {
                operation: operation.to_owned(),
                expected: info.parts.len(),
                given: params.len(),
            });
        }

        let envelope = info
            .parts
            .iter()
            .zip(params)
            .fold(Envelope::new(info.namespace, info.name), |envelope, (name, value)| {
                envelope.part(*name, value)
            });

        debug!(operation, action = info.action, "invoking remote operation");
        let body = self
            .transport
            .post(&self.endpoint, info.action, envelope.to_request()?)?;

        if !self.options.huge_tree && body.len() > MAX_DOCUMENT_BYTES {
            return Err(Error::DocumentTooLarge);
        }

        let response = Response::parse(&body).map_err(|err| match err {
            soap::Error::XmlError(xml::Error::TooDeep(_)) => Error::DocumentTooLarge,
            err => err.into(),
        })?;
        if let Some(fault) = response.fault() {
            return Err(Error::Fault(fault));
        }

        let (entry, scope) = response.body_entry()?;
        let scope = scope.enter(entry);

        let value = match entry.child_elements().next() {
            Some(part) => Decoder::new(&self.definition, self.options).decode(part, &scope)?,
            None => Value::Null,
        };

        Ok(value)
    }

    pub fn login(&self, user: &str, key: &str) -> Result<Session<'_, T>, Error> {
        let id = match self.invoke("login", vec![user.into(), key.into()]) {
            Ok(value) => value.text()?.trim().to_owned(),
            Err(Error::Fault(fault)) => return Err(Error::AuthError(fault)),
            Err(err) => return Err(Error::rpc("login", err)),
        };

        info!(user, "logged in");

        Ok(Session {
            client: self,
            id,
            closed: false,
        })
    }
}

impl<'a, T: Transport> Session<'a, T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The generic V1 entry point: `call(sessionId, resourcePath, args)`.
    pub fn call(&self, resource_path: &str, args: Vec<Param>) -> Result<Value, Error> {
        debug!(resource_path, "calling resource");

        self.client
            .invoke(
                "call",
                vec![self.id.as_str().into(), resource_path.into(), Param::Array(args)],
            )
            .map_err(|err| Error::rpc(resource_path, err))
    }

    /// A named operation; the session id is passed as its first part.
    pub fn invoke(&self, operation: &str, mut params: Vec<Param>) -> Result<Value, Error> {
        params.insert(0, self.id.as_str().into());

        self.client
            .invoke(operation, params)
            .map_err(|err| Error::rpc(operation, err))
    }

    pub fn catalog_product_attribute_set_list(&self) -> Result<Value, Error> {
        self.invoke("catalogProductAttributeSetList", Vec::new())
    }

    pub fn catalog_product_attribute_list(&self, set_id: &str) -> Result<Value, Error> {
        self.invoke("catalogProductAttributeList", vec![set_id.into()])
    }

    pub fn close(mut self) {
        self.end();
    }

    fn end(&mut self) {
        if mem::replace(&mut self.closed, true) {
            return;
        }

        match self.client.invoke("endSession", vec![self.id.as_str().into()]) {
            Ok(_) => debug!("session closed"),
            Err(err) => warn!("unable to close session: {}", describe(&err)),
        }
    }
}

impl<'a, T: Transport> Drop for Session<'a, T> {
    fn drop(&mut self) {
        self.end();
    }
}
