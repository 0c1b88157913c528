use magesoap_util::soap::{SOAP_ENCODING, XML_SCHEMA};

#[derive(Default, Debug, Clone)]
pub struct Namespaces(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedName {
    namespace_idx: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// `<sequence><any/></sequence>`: content is accepted as-is.
    Any,
    Struct(Vec<Field>),
    Array(Option<NamespacedName>),
    Simple(Option<NamespacedName>),
    Alias(NamespacedName),
}

#[derive(Debug, Clone)]
pub struct Type {
    pub name: NamespacedName,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub name: String,
    pub action: Option<String>,
    pub style: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    pub transport: Option<String>,
    pub style: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub target_namespace: Option<String>,
    pub namespaces: Namespaces,
    pub imported: Vec<String>,
    pub types: Vec<Type>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
    /// Every type named by a `type`, `base`, `element` or `arrayType`
    /// attribute, declared or not.
    pub references: Vec<NamespacedName>,
}

/// What a caller needs to invoke one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo<'a> {
    pub name: &'a str,
    pub action: &'a str,
    pub namespace: &'a str,
    pub parts: Vec<&'a str>,
}

impl Namespaces {
    pub fn namespaces(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or_default()
    }

    pub fn add_or_get(&mut self, namespace: &str) -> usize {
        if let Some(index) = self.index_of(namespace) {
            index
        } else {
            let index = self.0.len();
            self.0.push(namespace.to_owned());
            index
        }
    }

    fn index_of(&self, namespace: &str) -> Option<usize> {
        self.0.iter().position(|value| value == namespace)
    }
}

impl NamespacedName {
    pub fn new(namespaces: &mut Namespaces, namespace: &str, name: String) -> Self {
        Self {
            namespace_idx: namespaces.add_or_get(namespace),
            name,
        }
    }

    pub fn index(&self) -> usize {
        self.namespace_idx
    }
}

impl Definition {
    pub fn namespace_of(&self, name: &NamespacedName) -> &str {
        self.namespaces.get(name.index())
    }

    fn matches(&self, name: &NamespacedName, namespace: &str, local: &str) -> bool {
        name.name == local && self.namespace_of(name) == namespace
    }

    pub fn find_type(&self, namespace: &str, name: &str) -> Option<&Type> {
        self.types
            .iter()
            .find(|ty| self.matches(&ty.name, namespace, name))
    }

    /// Address of the first port that declares one.
    pub fn endpoint(&self) -> Option<&str> {
        self.services
            .iter()
            .flat_map(|service| &service.ports)
            .find_map(|port| port.location.as_deref())
    }

    pub fn operation(&self, name: &str) -> Option<OperationInfo<'_>> {
        let (binding, binding_operation) = self.bindings.iter().find_map(|binding| {
            binding
                .operations
                .iter()
                .find(|operation| operation.name == name)
                .map(|operation| (binding, operation))
        })?;

        let port_type = self.port_types.iter().find(|port_type| {
            port_type.name.name == binding.ty.name
                && port_type.name.index() == binding.ty.index()
        })?;
        let operation = port_type
            .operations
            .iter()
            .find(|operation| operation.name == name)?;

        let parts: Vec<&str> = operation
            .input
            .as_ref()
            .and_then(|input| {
                self.messages.iter().find(|message| {
                    message.name.name == input.name && message.name.index() == input.index()
                })
            })
            .map(|message| message.parts.iter().map(|part| part.name.as_str()).collect())
            .unwrap_or_default();

        Some(OperationInfo {
            name: &operation.name,
            action: binding_operation.action.as_deref().unwrap_or_default(),
            namespace: binding_operation
                .namespace
                .as_deref()
                .or(self.target_namespace.as_deref())
                .unwrap_or_default(),
            parts,
        })
    }

    fn is_resolved(&self, name: &NamespacedName) -> bool {
        let namespace = self.namespace_of(name);

        namespace == XML_SCHEMA
            || namespace == SOAP_ENCODING
            || self.imported.iter().any(|imported| imported == namespace)
            || self.find_type(namespace, &name.name).is_some()
    }

    /// Referenced types that no schema in the document declares, as
    /// `{namespace}name`, without duplicates.
    pub fn unresolved_types(&self) -> Vec<String> {
        let mut unresolved: Vec<String> = Vec::new();

        for reference in &self.references {
            if self.is_resolved(reference) {
                continue;
            }

            let name = format!("{{{}}}{}", self.namespace_of(reference), reference.name);
            if !unresolved.contains(&name) {
                unresolved.push(name);
            }
        }

        unresolved
    }
}
