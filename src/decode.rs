use magesoap_util::{
    soap::{APACHE_SOAP, SOAP_ENCODING, XML_SCHEMA, XML_SCHEMA_INSTANCE},
    xml::{Element, Scope},
};
use magesoap_wsdl::types::{Definition, TypeKind};

use crate::{
    client::ClientOptions,
    value::{Mapping, Value, ANY_KEY},
    Error,
};

/// Nesting allowed without the large-document allowance.
pub(crate) const MAX_DEPTH: usize = 256;

/// Turns SOAP-encoded response parts into [`Value`]s, using `xsi:type` and the
/// types the WSDL declares.
pub(crate) struct Decoder<'a> {
    definition: &'a Definition,
    options: ClientOptions,
}

fn any_content(element: &Element) -> Value {
    let children = element
        .child_elements()
        .cloned()
        .map(Value::Element)
        .collect();

    Value::Mapping(Mapping::from_iter([(ANY_KEY, Value::Sequence(children))]))
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(definition: &'a Definition, options: ClientOptions) -> Self {
        Self {
            definition,
            options,
        }
    }

    /// `scope` is the scope of `element`'s parent.
    pub(crate) fn decode(&self, element: &Element, scope: &Scope) -> Result<Value, Error> {
        self.decode_at(element, scope, 0)
    }

    fn decode_at(&self, element: &Element, parent: &Scope, depth: usize) -> Result<Value, Error> {
        if !self.options.huge_tree && depth > MAX_DEPTH {
            return Err(Error::DocumentTooLarge);
        }

        let scope = parent.enter(element);

        if matches!(
            element.attribute_ns(&scope, XML_SCHEMA_INSTANCE, "nil"),
            Some("true") | Some("1")
        ) {
            return Ok(Value::Null);
        }

        let ty = match element.attribute_ns(&scope, XML_SCHEMA_INSTANCE, "type") {
            Some(ty) => Some(
                scope
                    .resolve_qname(ty)
                    .ok_or_else(|| Error::UnknownType(ty.to_owned()))?,
            ),
            None => None,
        };

        let is_array = element
            .attribute_ns(&scope, SOAP_ENCODING, "arrayType")
            .is_some()
            || ty
                .as_ref()
                .map_or(false, |ty| ty.is(SOAP_ENCODING, "Array"));

        if is_array {
            return self.sequence(element, &scope, depth);
        }

        let ty = match ty {
            Some(ty) => ty,
            None => return self.structural(element, &scope, depth),
        };

        if ty.namespace == XML_SCHEMA {
            return self.structural(element, &scope, depth);
        }

        let declared = self
            .definition
            .find_type(&ty.namespace, &ty.local)
            .map(|declared| &declared.kind);

        match declared {
            Some(TypeKind::Any) => Ok(any_content(element)),
            Some(TypeKind::Array(_)) => self.sequence(element, &scope, depth),
            None if self.options.strict => Err(Error::UnknownType(ty.to_string())),
            _ if ty.is(APACHE_SOAP, "Map") => self.key_value_map(element, &scope, depth),
            Some(_) => self.structural(element, &scope, depth),
            None => self.structural(element, &scope, depth),
        }
    }

    fn sequence(&self, element: &Element, scope: &Scope, depth: usize) -> Result<Value, Error> {
        let items = element
            .child_elements()
            .map(|item| self.decode_at(item, scope, depth + 1))
            .collect::<Result<_, _>>()?;

        Ok(Value::Sequence(items))
    }

    /// `<item><key/><value/></item>` pairs.
    fn key_value_map(&self, element: &Element, scope: &Scope, depth: usize) -> Result<Value, Error> {
        let mut mapping = Mapping::new();

        for item in element.child_elements() {
            let key = match item.child("key") {
                Some(key) => key.text_content(),
                None => continue,
            };

            let value = match item.child("value") {
                Some(value) => self.decode_at(value, &scope.enter(item), depth + 2)?,
                None => Value::Null,
            };

            mapping.insert(key, value);
        }

        Ok(Value::Mapping(mapping))
    }

    /// Shape taken from the element itself: leaves are scalars, repeated
    /// `item`s are sequences or maps, anything else is a struct.
    fn structural(&self, element: &Element, scope: &Scope, depth: usize) -> Result<Value, Error> {
        if !element.has_child_elements() {
            return Ok(Value::Scalar(element.text_content()));
        }

        let children: Vec<&Element> = element.child_elements().collect();

        if children.iter().all(|child| child.local_name() == "item") {
            let pairs = children
                .iter()
                .all(|child| child.child("key").is_some() && child.child("value").is_some());

            return if pairs {
                self.key_value_map(element, scope, depth)
            } else {
                self.sequence(element, scope, depth)
            };
        }

        let mut mapping = Mapping::new();
        for child in children {
            mapping.insert(child.local_name(), self.decode_at(child, scope, depth + 1)?);
        }

        Ok(Value::Mapping(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magesoap_util::xml::Document;

    const V1: &str = include_str!("../tests/fixtures/magento_v1.wsdl");

    const MAP_SET: &str = r#"<callReturn xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:ns2="http://xml.apache.org/xml-soap" xsi:type="ns2:Map">
        <item><key xsi:type="xsd:string">set_id</key><value xsi:type="xsd:string">4</value></item>
        <item><key xsi:type="xsd:string">name</key><value xsi:type="xsd:string">Default</value></item>
    </callReturn>"#;

    fn decode(definition: &Definition, options: ClientOptions, xml: &str) -> Result<Value, Error> {
        let document = Document::parse(xml.as_bytes()).unwrap();
        Decoder::new(definition, options).decode(&document.root, &Scope::default())
    }

    fn strict() -> ClientOptions {
        ClientOptions {
            strict: true,
            ..ClientOptions::default()
        }
    }

    #[test]
    fn declared_open_maps_keep_raw_elements() {
        let patched = magesoap_wsdl::patch(V1.as_bytes()).unwrap();
        let definition = magesoap_wsdl::parse(&patched).unwrap();

        for options in [ClientOptions::default(), strict()] {
            let value = decode(&definition, options, MAP_SET).unwrap();
            let items = value.get(ANY_KEY).unwrap().as_sequence().unwrap();

            assert_eq!(items.len(), 2);
            assert!(matches!(items[0], Value::Element(_)));
            assert_eq!(items[0].text().unwrap(), "set_id4");
            assert_eq!(items[1].text().unwrap(), "nameDefault");
        }
    }

    #[test]
    fn undeclared_maps_read_as_key_value_pairs() {
        let definition = magesoap_wsdl::parse(V1.as_bytes()).unwrap();

        let value = decode(&definition, ClientOptions::default(), MAP_SET).unwrap();
        assert_eq!(value.field("set_id"), "4");
        assert_eq!(value.field("name"), "Default");

        assert!(matches!(
            decode(&definition, strict(), MAP_SET),
            Err(Error::UnknownType(ty)) if ty == "{http://xml.apache.org/xml-soap}Map"
        ));
    }

    #[test]
    fn reads_trees_of_maps() {
        let definition = magesoap_wsdl::parse(V1.as_bytes()).unwrap();
        let tree = r#"<callReturn xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/" xmlns:ns2="http://xml.apache.org/xml-soap" xsi:type="ns2:Map">
            <item><key>category_id</key><value>1</value></item>
            <item><key>description</key><value xsi:nil="true"/></item>
            <item><key>children</key><value SOAP-ENC:arrayType="ns2:Map[1]" xsi:type="SOAP-ENC:Array">
                <item xsi:type="ns2:Map">
                    <item><key>category_id</key><value>2</value></item>
                    <item><key>children</key><value SOAP-ENC:arrayType="ns2:Map[0]" xsi:type="SOAP-ENC:Array"/></item>
                </item>
            </value></item>
        </callReturn>"#;

        let value = decode(&definition, ClientOptions::default(), tree).unwrap();
        assert_eq!(value.field("category_id"), "1");
        assert!(value.get("description").unwrap().is_null());

        let children = value.get("children").unwrap().as_sequence().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].field("category_id"), "2");
        assert_eq!(children[0].get("children").unwrap().as_sequence().unwrap().len(), 0);
    }

    #[test]
    fn untyped_elements_follow_their_shape() {
        let definition = magesoap_wsdl::parse(V1.as_bytes()).unwrap();

        let value = decode(
            &definition,
            strict(),
            "<result><item><code>color</code></item><item><code>size</code></item></result>",
        )
        .unwrap();
        let items = value.as_sequence().unwrap();
        assert_eq!(items[1].field("code"), "size");

        let value = decode(&definition, strict(), "<loginReturn> abc </loginReturn>").unwrap();
        assert_eq!(value, Value::Scalar("abc".into()));
    }

    #[test]
    fn nesting_is_limited_without_the_allowance() {
        let definition = magesoap_wsdl::parse(V1.as_bytes()).unwrap();
        let depth = MAX_DEPTH + 10;
        let xml = format!("{}leaf{}", "<node><inner>".repeat(depth), "</inner></node>".repeat(depth));

        let limited = ClientOptions {
            strict: false,
            huge_tree: false,
        };
        assert!(matches!(
            decode(&definition, limited, &xml),
            Err(Error::DocumentTooLarge)
        ));
        assert!(decode(&definition, ClientOptions::default(), &xml).is_ok());
    }
}
