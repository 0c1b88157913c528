use magesoap_util::{
    soap::XML_SCHEMA,
    xml::{Document, Element, Node, Scope},
};
use tracing::debug;

use super::{error, WSDL};

pub use magesoap_util::soap::APACHE_SOAP as MAP_NAMESPACE;

/// Declares `{http://xml.apache.org/xml-soap}Map` as an open content model.
/// Responses typed with it are then read as raw child elements.
const MAP_SCHEMA: &str = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema" targetNamespace="http://xml.apache.org/xml-soap">
    <complexType name="Map">
        <sequence>
            <any processContents="lax" minOccurs="0" maxOccurs="unbounded"/>
        </sequence>
    </complexType>
</schema>"#;

/// Inserts the `Map` schema into a serialized WSDL unless it is already
/// declared, and returns the document serialized again.
pub fn patch(wsdl: &[u8]) -> Result<Vec<u8>, error::Error> {
    let mut document = Document::parse(wsdl)?;

    if patch_document(&mut document)? {
        debug!("inserted schema for {}", MAP_NAMESPACE);
    } else {
        debug!("schema for {} already present", MAP_NAMESPACE);
    }

    Ok(document.to_bytes()?)
}

/// Returns whether the document was changed. The root element is not
/// checked; `types` is looked up in the WSDL namespace below whatever it is.
pub fn patch_document(document: &mut Document) -> Result<bool, error::Error> {
    let root = &mut document.root;
    let scope = Scope::default().enter(root);

    let has_types = root
        .child_elements()
        .any(|element| element.is(&scope.enter(element), WSDL, "types"));

    if !has_types {
        root.children.insert(0, Node::Element(types_element(&scope)));
    }

    let types = root
        .child_elements_mut()
        .find(|element| element.is(&scope.enter(element), WSDL, "types"))
        .ok_or(error::Error::NotAWsdl)?;
    let types_scope = scope.enter(types);

    let declared = types.child_elements().any(|schema| {
        let scope = types_scope.enter(schema);
        schema.is(&scope, XML_SCHEMA, "schema")
            && schema.attribute("targetNamespace") == Some(MAP_NAMESPACE)
    });

    if declared {
        return Ok(false);
    }

    let schema = Document::parse(MAP_SCHEMA.as_bytes())?.root;
    types.children.push(Node::Element(schema));
    Ok(true)
}

/// A `types` element named with whatever prefix the document already binds
/// to the WSDL namespace.
fn types_element(scope: &Scope) -> Element {
    match scope.prefix_for(WSDL) {
        Some(None) => Element::new("types"),
        Some(Some(prefix)) => Element::new(format!("{}:types", prefix)),
        None => Element::new("wsdl:types").with_attribute("xmlns:wsdl", WSDL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" xmlns:xsd="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:Magento">
    <wsdl:types>
        <xsd:schema targetNamespace="urn:Magento">
            <xsd:complexType name="FixedArray"/>
        </xsd:schema>
    </wsdl:types>
    <wsdl:message name="endSession"/>
</wsdl:definitions>"#;

    const DEFAULT_NAMESPACE: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:Magento">
    <message name="endSession"/>
</definitions>"#;

    fn map_schemas(wsdl: &[u8]) -> usize {
        let document = Document::parse(wsdl).unwrap();
        let scope = Scope::default().enter(&document.root);
        let mut count = 0;

        for types in document.root.child_elements() {
            let types_scope = scope.enter(types);
            if !types.is(&types_scope, WSDL, "types") {
                continue;
            }

            for schema in types.child_elements() {
                if schema.is(&types_scope.enter(schema), XML_SCHEMA, "schema")
                    && schema.attribute("targetNamespace") == Some(MAP_NAMESPACE)
                {
                    count += 1;
                }
            }
        }

        count
    }

    #[test]
    fn inserts_map_schema_once() {
        let patched = patch(PREFIXED.as_bytes()).unwrap();
        assert_eq!(map_schemas(&patched), 1);

        let definition = crate::parse(&patched).unwrap();
        let map = definition.find_type(MAP_NAMESPACE, "Map").unwrap();
        assert_eq!(map.kind, crate::types::TypeKind::Any);
    }

    #[test]
    fn patching_is_idempotent() {
        let once = patch(PREFIXED.as_bytes()).unwrap();
        let twice = patch(&once).unwrap();

        assert_eq!(map_schemas(&twice), 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_existing_declaration_whatever_its_content() {
        let wsdl = PREFIXED.replace(
            "</wsdl:types>",
            r#"<xsd:schema targetNamespace="http://xml.apache.org/xml-soap"><xsd:complexType name="Other"/></xsd:schema></wsdl:types>"#,
        );

        let mut document = Document::parse(wsdl.as_bytes()).unwrap();
        assert!(!patch_document(&mut document).unwrap());
        assert_eq!(map_schemas(&patch(wsdl.as_bytes()).unwrap()), 1);
    }

    #[test]
    fn creates_types_section_first_when_missing() {
        let patched = patch(DEFAULT_NAMESPACE.as_bytes()).unwrap();
        let document = Document::parse(&patched).unwrap();

        let first = document.root.child_elements().next().unwrap();
        assert_eq!(first.name, "types");
        assert_eq!(map_schemas(&patched), 1);
    }

    #[test]
    fn reuses_the_documents_wsdl_prefix() {
        let wsdl = r#"<w:definitions xmlns:w="http://schemas.xmlsoap.org/wsdl/"><w:message name="a"/></w:definitions>"#;
        let document = Document::parse(&patch(wsdl.as_bytes()).unwrap()).unwrap();
        assert_eq!(document.root.child_elements().next().unwrap().name, "w:types");

        let mut bare = Document::new(Element::new("definitions"));
        assert!(patch_document(&mut bare).unwrap());
        let types = bare.root.child_elements().next().unwrap();
        assert_eq!(types.name, "wsdl:types");
        assert_eq!(types.attribute("xmlns:wsdl"), Some(WSDL));
    }

    #[test]
    fn accepts_a_byte_order_mark() {
        let mut wsdl = b"\xEF\xBB\xBF".to_vec();
        wsdl.extend_from_slice(br#"<?xml version="1.0" encoding="UTF-8"?><definitions xmlns="http://schemas.xmlsoap.org/wsdl/"><message name="a"/></definitions>"#);

        let patched = patch(&wsdl).unwrap();
        assert_eq!(map_schemas(&patched), 1);
    }

    #[test]
    fn reports_malformed_input() {
        assert!(matches!(
            patch(b"<definitions><types></definitions>"),
            Err(error::Error::XmlParseError(_))
        ));
    }
}
