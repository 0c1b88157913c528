use magesoap_util::{
    soap::{SOAP_ENCODING, XML_SCHEMA},
    xml::{split_qname, Document, Element, Scope},
};
use tracing::trace;

use super::{
    error,
    types::{
        Binding, BindingOperation, Definition, Field, Message, NamespacedName, Operation, Port,
        PortType, Service, Type, TypeKind,
    },
    WSDL, WSDL_SOAP, WSDL_SOAP12,
};

struct Parser {
    definition: Definition,
}

fn required(
    element: &Element,
    element_name: &'static str,
    attribute: &'static str,
) -> Result<String, error::Error> {
    element
        .attribute(attribute)
        .map(ToOwned::to_owned)
        .ok_or(error::Error::MissingAttribute {
            element: element_name,
            attribute,
        })
}

fn is_soap_extension(element: &Element, scope: &Scope, local_name: &str) -> bool {
    element.is(scope, WSDL_SOAP, local_name) || element.is(scope, WSDL_SOAP12, local_name)
}

/// `typens:Entity[]` names the item type `typens:Entity`.
fn strip_array_suffix(value: &str) -> &str {
    value.find('[').map_or(value, |index| &value[..index])
}

impl Parser {
    fn new() -> Self {
        Self {
            definition: Definition::default(),
        }
    }

    fn named(&mut self, namespace: &str, name: String) -> NamespacedName {
        NamespacedName::new(&mut self.definition.namespaces, namespace, name)
    }

    fn target_namespaced(&mut self, name: String) -> NamespacedName {
        let target = self.definition.target_namespace.clone().unwrap_or_default();
        self.named(&target, name)
    }

    fn resolve_namespace(
        &mut self,
        scope: &Scope,
        prefixed_name: &str,
    ) -> Result<NamespacedName, error::Error> {
        let name = scope
            .resolve_qname(prefixed_name)
            .ok_or_else(|| {
                error::Error::UnboundPrefix(
                    split_qname(prefixed_name).0.unwrap_or_default().to_owned(),
                )
            })?;

        Ok(self.named(&name.namespace, name.local))
    }

    fn parse(mut self, document: &Document) -> Result<Definition, error::Error> {
        let root = &document.root;
        let scope = Scope::default().enter(root);

        if !root.is(&scope, WSDL, "definitions") {
            return Err(error::Error::NotAWsdl);
        }

        self.definition.target_namespace = root.attribute("targetNamespace").map(ToOwned::to_owned);

        for child in root.child_elements() {
            let scope = scope.enter(child);

            if child.namespace(&scope) != Some(WSDL) {
                trace!("FOUND {} INSIDE DEFINITION BLOCK", child.name);
                continue;
            }

            match child.local_name() {
                "import" => self.handle_import(child),
                "types" => self.handle_types(child, &scope)?,
                "message" => self.handle_message(child, &scope)?,
                "portType" => self.handle_port_type(child, &scope)?,
                "binding" => self.handle_binding(child, &scope)?,
                "service" => self.handle_service(child, &scope)?,
                "documentation" => (),
                other => trace!("FOUND {} INSIDE DEFINITION BLOCK", other),
            }
        }

        Ok(self.definition)
    }

    fn handle_import(&mut self, import: &Element) {
        if let Some(namespace) = import.attribute("namespace") {
            self.definition.imported.push(namespace.to_owned());
        }
    }

    fn handle_types(&mut self, types: &Element, scope: &Scope) -> Result<(), error::Error> {
        for child in types.child_elements() {
            let scope = scope.enter(child);

            if child.is(&scope, XML_SCHEMA, "schema") {
                self.handle_schema(child, &scope)?;
            } else {
                trace!("FOUND {} INSIDE TYPES BLOCK", child.name);
            }
        }

        Ok(())
    }

    fn handle_schema(&mut self, schema: &Element, scope: &Scope) -> Result<(), error::Error> {
        let target = schema.attribute("targetNamespace").unwrap_or_default().to_owned();

        for child in schema.child_elements() {
            let scope = scope.enter(child);

            match child.local_name() {
                "complexType" => {
                    let name = required(child, "complexType", "name")?;
                    let kind = self.complex_type(child, &scope)?;
                    let name = self.named(&target, name);
                    self.definition.types.push(Type { name, kind });
                }

                "simpleType" => {
                    let name = required(child, "simpleType", "name")?;
                    let base = match child.child("restriction").and_then(|r| r.attribute("base")) {
                        Some(base) => Some(self.resolve_namespace(&scope, base)?),
                        None => None,
                    };
                    let name = self.named(&target, name);
                    self.definition.types.push(Type {
                        name,
                        kind: TypeKind::Simple(base),
                    });
                }

                "element" => {
                    let [name, ty] = child.attributes_named(["name", "type"]);
                    let name = name.ok_or(error::Error::MissingAttribute {
                        element: "element",
                        attribute: "name",
                    })?;

                    let kind = match (ty, child.child("complexType")) {
                        (Some(ty), _) => TypeKind::Alias(self.resolve_namespace(&scope, &ty)?),
                        (None, Some(inner)) => {
                            let inner_scope = scope.enter(inner);
                            self.complex_type(inner, &inner_scope)?
                        }
                        (None, None) => TypeKind::Simple(None),
                    };
                    let name = self.named(&target, name);
                    self.definition.types.push(Type { name, kind });
                }

                "import" | "include" => self.handle_import(child),

                _ => trace!("FOUND {} INSIDE SCHEMA BLOCK", child.name),
            }
        }

        self.collect_references(schema, scope)
    }

    fn complex_type(&mut self, element: &Element, scope: &Scope) -> Result<TypeKind, error::Error> {
        for child in element.child_elements() {
            let scope = scope.enter(child);

            match child.local_name() {
                "sequence" | "all" | "choice" => return self.fields(child, &scope),

                "complexContent" => {
                    let derivation = match child.child_elements().next() {
                        Some(derivation) => derivation,
                        None => continue,
                    };
                    let scope = scope.enter(derivation);
                    let base = required(derivation, "complexContent", "base")?;
                    let base = self.resolve_namespace(&scope, &base)?;

                    if base.name == "Array"
                        && self.definition.namespace_of(&base) == SOAP_ENCODING
                    {
                        return self.array_item(derivation, &scope);
                    }

                    let mut fields = vec![Field {
                        name: "base".to_owned(),
                        ty: Some(base),
                    }];
                    if let Some(sequence) = derivation.child("sequence") {
                        let scope = scope.enter(sequence);
                        match self.fields(sequence, &scope)? {
                            TypeKind::Struct(extra) => fields.extend(extra),
                            other => return Ok(other),
                        }
                    }
                    return Ok(TypeKind::Struct(fields));
                }

                "simpleContent" => {
                    let base = match child.child_elements().next().and_then(|e| e.attribute("base")) {
                        Some(base) => Some(self.resolve_namespace(&scope, base)?),
                        None => None,
                    };
                    return Ok(TypeKind::Simple(base));
                }

                _ => trace!("FOUND {} INSIDE COMPLEX TYPE BLOCK", child.name),
            }
        }

        Ok(TypeKind::Struct(Vec::new()))
    }

    fn fields(&mut self, sequence: &Element, scope: &Scope) -> Result<TypeKind, error::Error> {
        let mut fields = Vec::new();

        for child in sequence.child_elements() {
            let scope = scope.enter(child);

            match child.local_name() {
                "any" => return Ok(TypeKind::Any),

                "element" => {
                    let [name, ty, reference] = child.attributes_named(["name", "type", "ref"]);
                    let ty = match ty.or(reference.clone()) {
                        Some(ty) => Some(self.resolve_namespace(&scope, &ty)?),
                        None => None,
                    };
                    let name = match name.or(reference) {
                        Some(name) => split_qname(&name).1.to_owned(),
                        None => {
                            return Err(error::Error::MissingAttribute {
                                element: "element",
                                attribute: "name",
                            })
                        }
                    };
                    fields.push(Field { name, ty });
                }

                _ => trace!("FOUND {} INSIDE SEQUENCE BLOCK", child.name),
            }
        }

        Ok(TypeKind::Struct(fields))
    }

    fn array_item(&mut self, derivation: &Element, scope: &Scope) -> Result<TypeKind, error::Error> {
        for attribute in derivation.child_elements() {
            let scope = scope.enter(attribute);
            if let Some(item) = attribute.attribute_ns(&scope, WSDL, "arrayType") {
                let item = self.resolve_namespace(&scope, strip_array_suffix(item))?;
                return Ok(TypeKind::Array(Some(item)));
            }
        }

        Ok(TypeKind::Array(None))
    }

    fn collect_references(&mut self, element: &Element, scope: &Scope) -> Result<(), error::Error> {
        for child in element.child_elements() {
            let scope = scope.enter(child);

            for key in ["type", "base"] {
                if let Some(value) = child.attribute(key) {
                    let reference = self.resolve_namespace(&scope, value)?;
                    self.definition.references.push(reference);
                }
            }

            if let Some(value) = child.attribute_ns(&scope, WSDL, "arrayType") {
                let reference = self.resolve_namespace(&scope, strip_array_suffix(value))?;
                self.definition.references.push(reference);
            }

            self.collect_references(child, &scope)?;
        }

        Ok(())
    }

    fn handle_message(&mut self, message: &Element, scope: &Scope) -> Result<(), error::Error> {
        let name = required(message, "message", "name")?;
        let mut parts = Vec::new();

        for part in message.child_elements() {
            let scope = scope.enter(part);
            if !part.is(&scope, WSDL, "part") {
                trace!("FOUND {} INSIDE MESSAGE BLOCK", part.name);
                continue;
            }

            let [part_name, ty, element] = part.attributes_named(["name", "type", "element"]);
            let part_name = part_name.ok_or(error::Error::MissingAttribute {
                element: "part",
                attribute: "name",
            })?;
            let ty = match ty.or(element) {
                Some(ty) => {
                    let ty = self.resolve_namespace(&scope, &ty)?;
                    self.definition.references.push(ty.clone());
                    Some(ty)
                }
                None => None,
            };

            parts.push(Field { name: part_name, ty });
        }

        let name = self.target_namespaced(name);
        self.definition.messages.push(Message { name, parts });
        Ok(())
    }

    fn handle_port_type(&mut self, port_type: &Element, scope: &Scope) -> Result<(), error::Error> {
        let name = required(port_type, "portType", "name")?;
        let mut operations = Vec::new();

        for operation in port_type.child_elements() {
            let scope = scope.enter(operation);
            if !operation.is(&scope, WSDL, "operation") {
                trace!("FOUND {} INSIDE PORT TYPE BLOCK", operation.name);
                continue;
            }

            let mut parsed = Operation {
                name: required(operation, "operation", "name")?,
                documentation: None,
                input: None,
                output: None,
            };

            for child in operation.child_elements() {
                let scope = scope.enter(child);

                match child.local_name() {
                    "documentation" => {
                        parsed.documentation = Some(child.text_content().trim().to_owned())
                    }
                    "input" | "output" => {
                        let message = required(child, "input", "message")?;
                        let message = Some(self.resolve_namespace(&scope, &message)?);

                        if child.local_name() == "input" {
                            parsed.input = message;
                        } else {
                            parsed.output = message;
                        }
                    }
                    _ => trace!("FOUND {} INSIDE OPERATION BLOCK", child.name),
                }
            }

            operations.push(parsed);
        }

        let name = self.target_namespaced(name);
        self.definition
            .port_types
            .push(PortType { name, operations });
        Ok(())
    }

    fn handle_binding(&mut self, binding: &Element, scope: &Scope) -> Result<(), error::Error> {
        let name = required(binding, "binding", "name")?;
        let ty = required(binding, "binding", "type")?;
        let ty = self.resolve_namespace(scope, &ty)?;

        let mut transport = None;
        let mut style = None;
        let mut operations = Vec::new();

        for child in binding.child_elements() {
            let scope = scope.enter(child);

            if is_soap_extension(child, &scope, "binding") {
                let [binding_transport, binding_style] = child.attributes_named(["transport", "style"]);
                transport = binding_transport;
                style = binding_style;
            } else if child.is(&scope, WSDL, "operation") {
                operations.push(self.binding_operation(child, &scope)?);
            } else {
                trace!("FOUND {} INSIDE BINDING BLOCK", child.name);
            }
        }

        let name = self.target_namespaced(name);
        self.definition.bindings.push(Binding {
            name,
            ty,
            transport,
            style,
            operations,
        });
        Ok(())
    }

    fn binding_operation(
        &mut self,
        operation: &Element,
        scope: &Scope,
    ) -> Result<BindingOperation, error::Error> {
        let mut parsed = BindingOperation {
            name: required(operation, "operation", "name")?,
            action: None,
            style: None,
            namespace: None,
        };

        for child in operation.child_elements() {
            let scope = scope.enter(child);

            if is_soap_extension(child, &scope, "operation") {
                let [action, style] = child.attributes_named(["soapAction", "style"]);
                parsed.action = action;
                parsed.style = style;
            } else if child.is(&scope, WSDL, "input") {
                parsed.namespace = child
                    .child_elements()
                    .find(|body| is_soap_extension(body, &scope.enter(body), "body"))
                    .and_then(|body| body.attribute("namespace"))
                    .map(ToOwned::to_owned);
            }
        }

        Ok(parsed)
    }

    fn handle_service(&mut self, service: &Element, scope: &Scope) -> Result<(), error::Error> {
        let name = required(service, "service", "name")?;
        let mut ports = Vec::new();

        for port in service.child_elements() {
            let scope = scope.enter(port);
            if !port.is(&scope, WSDL, "port") {
                trace!("FOUND {} INSIDE SERVICE BLOCK", port.name);
                continue;
            }

            let binding = required(port, "port", "binding")?;
            let binding = self.resolve_namespace(&scope, &binding)?;
            let location = port
                .child_elements()
                .find(|address| is_soap_extension(address, &scope.enter(address), "address"))
                .and_then(|address| address.attribute("location"))
                .map(ToOwned::to_owned);

            ports.push(Port {
                name: required(port, "port", "name")?,
                binding,
                location,
            });
        }

        self.definition.services.push(Service { name, ports });
        Ok(())
    }
}

pub(crate) fn parse(document: &Document) -> Result<Definition, error::Error> {
    Parser::new().parse(document)
}
