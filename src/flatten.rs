//! Reshapes decoded responses into flat records.
//!
//! Extraction is tolerant: an item that does not have the expected shape is
//! reported as a [`MalformedRecord`] and skipped, never fatal.

use std::{cmp::Ordering, collections::HashMap};
use thiserror::Error;
use tracing::warn;

use crate::value::{Value, ANY_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {index} is malformed: {reason}")]
pub struct MalformedRecord {
    /// One-based position of the item in the response.
    pub index: usize,
    pub reason: String,
}

/// Records that could be read, and diagnostics for those that could not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub skipped: Vec<MalformedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSet {
    pub set_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_id: String,
    pub code: String,
    pub kind: String,
    pub required: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_id: String,
    pub is_active: String,
    pub position: String,
    pub level: String,
    pub parent_id: String,
    pub name: String,
    pub url_key: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub children_count: String,
    pub include_in_menu: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub store_id: String,
    pub code: String,
    pub website_id: String,
    pub group_id: String,
    pub name: String,
    pub sort_order: String,
    pub is_active: String,
}

/// A `catalog_product.list` item, optionally overlaid with its
/// `catalog_product.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub set: String,
    pub kind: String,
    pub category_ids: String,
    pub website_ids: String,
    pub price: String,
    pub status: String,
    pub updated_at: String,
}

/// A `product_attribute.info` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDetail {
    pub attribute_id: String,
    pub attribute_code: String,
    pub frontend_input: String,
    pub scope: String,
    pub is_required: String,
    pub default_value: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAttribute {
    pub attribute_id: String,
    pub code: String,
    pub label: String,
    pub kind: String,
    pub required: String,
    pub scope: String,
    pub options: Vec<String>,
}

/// Attributes keyed by `code`, in first-seen order. The first record for a
/// code wins.
#[derive(Debug, Clone, Default)]
pub struct AttributeIndex {
    attributes: Vec<Attribute>,
    positions: HashMap<String, usize>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Extraction<T> {
    fn push(&mut self, index: usize, record: Result<T, String>) {
        match record {
            Ok(record) => self.records.push(record),
            Err(reason) => self.skip(index, reason),
        }
    }

    fn skip<S: Into<String>>(&mut self, index: usize, reason: S) {
        let malformed = MalformedRecord {
            index,
            reason: reason.into(),
        };

        warn!("skipping {}", malformed);
        self.skipped.push(malformed);
    }

    /// Extracts every item of a sequence with `extract`.
    fn from_items<F>(value: &Value, extract: F) -> Self
    where
        F: Fn(&Value) -> Result<T, String>,
    {
        let mut extraction = Self::default();

        match value {
            Value::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    extraction.push(index + 1, extract(item));
                }
            }
            Value::Null => (),
            other => extraction.skip(0, format!("expected a list, found {}", other.kind())),
        }

        extraction
    }
}

/// Strips `prefix` from the start of `text`, ignoring case, and trims.
///
/// ```
/// use magesoap::flatten::clean_text;
///
/// assert_eq!(clean_text("set_id4", "set_id"), "4");
/// assert_eq!(clean_text("NameDefault", "name"), "Default");
/// assert_eq!(clean_text("", "name"), "");
/// ```
pub fn clean_text(text: &str, prefix: &str) -> String {
    match text.get(..prefix.len()) {
        Some(head) if !prefix.is_empty() && head.eq_ignore_ascii_case(prefix) => {
            text[prefix.len()..].trim().to_owned()
        }
        _ => text.trim().to_owned(),
    }
}

/// The list held under the reserved key, if `value` is such a wrapper.
fn open_content(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Mapping(mapping) => match mapping.get(ANY_KEY) {
            Some(Value::Sequence(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn attribute_set(item: &Value) -> Result<AttributeSet, String> {
    if let Value::Mapping(mapping) = item {
        if let (Some(set_id), Some(name)) = (mapping.get("set_id"), mapping.get("name")) {
            return Ok(AttributeSet {
                set_id: set_id.text().map_err(|err| err.to_string())?.trim().to_owned(),
                name: name.text().map_err(|err| err.to_string())?.trim().to_owned(),
            });
        }
    }

    let inner = open_content(item)
        .ok_or_else(|| format!("expected a wrapped record, found {}", item.kind()))?;

    if inner.is_empty() {
        return Err("wrapped record is empty".to_owned());
    }

    let elements = open_content(&inner[0]).unwrap_or(inner);
    if elements.len() < 2 {
        return Err(format!(
            "expected at least 2 elements, found {}",
            elements.len()
        ));
    }

    let text = |value: &Value| {
        value
            .text()
            .map(|text| text.trim().to_owned())
            .map_err(|err| err.to_string())
    };

    Ok(AttributeSet {
        set_id: clean_text(&text(&elements[0])?, "set_id"),
        name: clean_text(&text(&elements[1])?, "name"),
    })
}

/// Reads a `catalog_product_attribute_set.list` result.
pub fn attribute_sets(value: &Value) -> Extraction<AttributeSet> {
    match open_content(value) {
        Some(items) => Extraction::from_items(&Value::Sequence(items.to_vec()), attribute_set),
        None => Extraction::from_items(value, attribute_set),
    }
}

impl Attribute {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        value.as_mapping().map_err(|err| err.to_string())?;

        let code = value.field("code");
        if code.is_empty() {
            return Err("attribute has no code".to_owned());
        }

        Ok(Self {
            attribute_id: value.field("attribute_id"),
            code,
            kind: value.field("type"),
            required: value.field("required"),
            scope: value.field("scope"),
        })
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.attribute_id.clone(),
            self.code.clone(),
            self.kind.clone(),
            self.required.clone(),
            self.scope.clone(),
        ]
    }
}

/// Reads a `catalogProductAttributeList` result.
pub fn attributes(value: &Value) -> Extraction<Attribute> {
    Extraction::from_items(value, Attribute::from_value)
}

impl AttributeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the attribute was kept.
    pub fn insert(&mut self, attribute: Attribute) -> bool {
        if self.positions.contains_key(&attribute.code) {
            return false;
        }

        self.positions
            .insert(attribute.code.clone(), self.attributes.len());
        self.attributes.push(attribute);
        true
    }

    pub fn get(&self, code: &str) -> Option<&Attribute> {
        self.positions
            .get(code)
            .map(|&position| &self.attributes[position])
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn into_vec(self) -> Vec<Attribute> {
        self.attributes
    }
}

impl Extend<Attribute> for AttributeIndex {
    fn extend<I: IntoIterator<Item = Attribute>>(&mut self, iter: I) {
        for attribute in iter {
            self.insert(attribute);
        }
    }
}

/// Drops later attributes whose `code` was already seen.
pub fn dedupe(attributes: impl IntoIterator<Item = Attribute>) -> Vec<Attribute> {
    let mut index = AttributeIndex::new();
    index.extend(attributes);
    index.into_vec()
}

fn children(node: &Value) -> &[Value] {
    match node.get("children") {
        Ok(Value::Sequence(children)) => children,
        _ => &[],
    }
}

/// Visits a category tree in pre-order, with each node's depth.
pub fn walk_tree<'a, F: FnMut(&'a Value, usize)>(node: &'a Value, visit: &mut F) {
    fn walk<'a, F: FnMut(&'a Value, usize)>(node: &'a Value, depth: usize, visit: &mut F) {
        visit(node, depth);
        for child in children(node) {
            walk(child, depth + 1, visit);
        }
    }

    walk(node, 0, visit)
}

/// Every node of a category tree, parents before their children.
pub fn flatten_tree(root: &Value) -> Vec<&Value> {
    let mut nodes = Vec::new();
    walk_tree(root, &mut |node, _| nodes.push(node));
    nodes
}

impl Category {
    pub const COLUMNS: [&'static str; 12] = [
        "category_id",
        "is_active",
        "position",
        "level",
        "parent_id",
        "name",
        "url_key",
        "description",
        "created_at",
        "updated_at",
        "children_count",
        "include_in_menu",
    ];

    pub fn from_value(value: &Value) -> Result<Self, String> {
        value.as_mapping().map_err(|err| err.to_string())?;

        let category_id = value.field("category_id");
        if category_id.is_empty() {
            return Err("category has no category_id".to_owned());
        }

        Ok(Self {
            category_id,
            is_active: value.field("is_active"),
            position: value.field("position"),
            level: value.field("level"),
            parent_id: value.field("parent_id"),
            name: value.field("name"),
            url_key: value.field("url_key"),
            description: value.field("description"),
            created_at: value.field("created_at"),
            updated_at: value.field("updated_at"),
            children_count: value.field("children_count"),
            include_in_menu: value.field("include_in_menu"),
        })
    }

    pub fn row(&self) -> Vec<String> {
        [
            &self.category_id,
            &self.is_active,
            &self.position,
            &self.level,
            &self.parent_id,
            &self.name,
            &self.url_key,
            &self.description,
            &self.created_at,
            &self.updated_at,
            &self.children_count,
            &self.include_in_menu,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

fn numeric_order(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

/// Sorts by numeric `category_id`. Ids that are not numbers go last, in
/// their original order.
pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|left, right| numeric_order(&left.category_id, &right.category_id));
}

impl Store {
    pub const COLUMNS: [&'static str; 7] = [
        "store_id",
        "code",
        "website_id",
        "group_id",
        "name",
        "sort_order",
        "is_active",
    ];

    pub fn from_value(value: &Value) -> Result<Self, String> {
        value.as_mapping().map_err(|err| err.to_string())?;

        let store_id = value.field("store_id");
        if store_id.is_empty() {
            return Err("store has no store_id".to_owned());
        }

        Ok(Self {
            store_id,
            code: value.field("code"),
            website_id: value.field("website_id"),
            group_id: value.field("group_id"),
            name: value.field("name"),
            sort_order: value.field("sort_order"),
            is_active: value.field("is_active"),
        })
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.store_id.clone(),
            self.code.clone(),
            self.website_id.clone(),
            self.group_id.clone(),
            self.name.clone(),
            self.sort_order.clone(),
            self.is_active.clone(),
        ]
    }
}

/// Reads a `store.list` result.
pub fn stores(value: &Value) -> Extraction<Store> {
    Extraction::from_items(value, Store::from_value)
}

/// Text under `key`, with lists joined by commas.
fn joined_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Ok(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| item.text().ok())
            .collect::<Vec<_>>()
            .join(","),
        Ok(_) => value.field(key),
        Err(_) => String::new(),
    }
}

/// `label` of every `{value, label}` item of an options list.
pub fn option_labels(options: &Value) -> Vec<String> {
    match options {
        Value::Sequence(items) => items.iter().map(|item| item.field("label")).collect(),
        _ => Vec::new(),
    }
}

impl Product {
    pub const COLUMNS: [&'static str; 10] = [
        "product_id",
        "sku",
        "name",
        "set",
        "type",
        "category_ids",
        "website_ids",
        "price",
        "status",
        "updated_at",
    ];

    /// Reads each field from the first of `layers` that has it.
    fn read(layers: &[&Value]) -> Result<Self, String> {
        for layer in layers {
            layer.as_mapping().map_err(|err| err.to_string())?;
        }

        let field = |key: &str| {
            layers
                .iter()
                .find(|layer| layer.get(key).is_ok())
                .map(|layer| joined_field(layer, key))
                .unwrap_or_default()
        };

        let product_id = field("product_id");
        if product_id.is_empty() {
            return Err("product has no product_id".to_owned());
        }

        Ok(Self {
            product_id,
            sku: field("sku"),
            name: field("name"),
            set: field("set"),
            kind: field("type"),
            category_ids: field("category_ids"),
            website_ids: field("website_ids"),
            price: field("price"),
            status: field("status"),
            updated_at: field("updated_at"),
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, String> {
        Self::read(&[value])
    }

    /// `info` wins over `item` for keys both have.
    pub fn with_info(item: &Value, info: &Value) -> Result<Self, String> {
        Self::read(&[info, item])
    }

    pub fn row(&self) -> Vec<String> {
        [
            &self.product_id,
            &self.sku,
            &self.name,
            &self.set,
            &self.kind,
            &self.category_ids,
            &self.website_ids,
            &self.price,
            &self.status,
            &self.updated_at,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

/// Sorts by numeric `product_id`, non-numeric ids last.
pub fn sort_products(products: &mut [Product]) {
    products.sort_by(|left, right| numeric_order(&left.product_id, &right.product_id));
}

impl AttributeDetail {
    pub const COLUMNS: [&'static str; 7] = [
        "attribute_id",
        "attribute_code",
        "frontend_input",
        "scope",
        "is_required",
        "default_value",
        "options",
    ];

    pub fn from_value(value: &Value) -> Result<Self, String> {
        value.as_mapping().map_err(|err| err.to_string())?;

        let attribute_code = value.field("attribute_code");
        if attribute_code.is_empty() {
            return Err("attribute has no attribute_code".to_owned());
        }

        Ok(Self {
            attribute_id: value.field("attribute_id"),
            attribute_code,
            frontend_input: value.field("frontend_input"),
            scope: value.field("scope"),
            is_required: value.field("is_required"),
            default_value: value.field("default_value"),
            options: value.get("options").map(option_labels).unwrap_or_default(),
        })
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.attribute_id.clone(),
            self.attribute_code.clone(),
            self.frontend_input.clone(),
            self.scope.clone(),
            self.is_required.clone(),
            self.default_value.clone(),
            self.options.join(", "),
        ]
    }
}

impl CategoryAttribute {
    pub const COLUMNS: [&'static str; 7] = [
        "attribute_id",
        "code",
        "label",
        "type",
        "required",
        "scope",
        "options",
    ];

    pub fn from_value(value: &Value) -> Result<Self, String> {
        value.as_mapping().map_err(|err| err.to_string())?;

        let code = value.field("code");
        if code.is_empty() {
            return Err("attribute has no code".to_owned());
        }

        let label = match value.field("frontend_label") {
            label if label.is_empty() => code.clone(),
            label => label,
        };

        Ok(Self {
            attribute_id: value.field("attribute_id"),
            code,
            label,
            kind: value.field("type"),
            required: value.field("required"),
            scope: value.field("scope"),
            options: Vec::new(),
        })
    }

    /// Whether `catalog_category_attribute.options` applies.
    pub fn has_options(&self) -> bool {
        matches!(self.kind.as_str(), "select" | "multiselect")
    }

    pub fn row(&self) -> Vec<String> {
        let attribute_id = match self.attribute_id.as_str() {
            "" => "null".to_owned(),
            id => id.to_owned(),
        };

        vec![
            attribute_id,
            self.code.clone(),
            self.label.clone(),
            self.kind.clone(),
            self.required.clone(),
            self.scope.clone(),
            self.options.join(", "),
        ]
    }
}

/// Reads a `catalog_category_attribute.list` result.
pub fn category_attributes(value: &Value) -> Extraction<CategoryAttribute> {
    Extraction::from_items(value, CategoryAttribute::from_value)
}

/// Sorts by numeric `attribute_id`; missing or non-numeric ids count as 0.
pub fn sort_category_attributes(attributes: &mut [CategoryAttribute]) {
    attributes.sort_by_key(|attribute| attribute.attribute_id.parse::<u64>().unwrap_or(0));
}
