//! The reports the command line offers, each a short fixed sequence of remote
//! calls rendered as a table.

use magesoap_util::soap::Transport;
use std::io::Write;
use tracing::{info, warn};

use crate::{
    client::{ClientOptions, Session, SoapClient},
    config::{ApiVersion, Config},
    error::describe,
    flatten::{
        self, AttributeDetail, AttributeIndex, Category, CategoryAttribute, MalformedRecord,
        Product, Store,
    },
    value::Value,
    render::{
        Renderer, Table, ATTRIBUTE_DETAIL_WIDTHS, ATTRIBUTE_SET_WIDTHS, ATTRIBUTE_WIDTHS,
        CATEGORY_ATTRIBUTE_WIDTHS, CATEGORY_WIDTHS, PRODUCT_WIDTHS, STORE_WIDTHS,
    },
    Error,
};

/// Rows printed and items skipped by one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub rows: usize,
    pub skipped: usize,
}

/// The WSDL a report talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub version: ApiVersion,
    /// Whether the `Map` schema has to be added before use.
    pub patch: bool,
}

/// Where to load a WSDL from, and whether to patch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlSource {
    pub location: String,
    pub patch: bool,
}

impl Target {
    pub const ATTRIBUTE_SETS: Target = Target {
        version: ApiVersion::V1Wsdl2,
        patch: true,
    };
    pub const ATTRIBUTES: Target = Target {
        version: ApiVersion::V2,
        patch: true,
    };
    pub const CATEGORIES: Target = Target {
        version: ApiVersion::V1,
        patch: false,
    };
    pub const STORES: Target = Target {
        version: ApiVersion::V1,
        patch: false,
    };
    pub const PRODUCTS: Target = Target {
        version: ApiVersion::V1,
        patch: false,
    };
    pub const ATTRIBUTE_DETAILS: Target = Target {
        version: ApiVersion::V1,
        patch: false,
    };
    pub const CATEGORY_ATTRIBUTES: Target = Target {
        version: ApiVersion::V1,
        patch: false,
    };

    /// The configured server's WSDL, unless `location` overrides it.
    pub fn source(self, config: &Config, location: Option<&str>) -> Result<WsdlSource, Error> {
        let location = match location {
            Some(location) => location.to_owned(),
            None => config.wsdl_url(self.version)?.to_string(),
        };

        Ok(WsdlSource {
            location,
            patch: self.patch,
        })
    }
}

impl WsdlSource {
    pub fn load(&self) -> Result<Vec<u8>, Error> {
        info!(location = %self.location, patch = self.patch, "loading WSDL");

        Ok(if self.patch {
            magesoap_wsdl::fetch_patched(&self.location)?
        } else {
            magesoap_wsdl::fetch(&self.location)?
        })
    }
}

/// Loads the WSDL, logs in, hands the session to `report` and ends the
/// session whatever `report` returns.
pub fn run<T, F, R>(
    config: &Config,
    source: &WsdlSource,
    transport: T,
    options: ClientOptions,
    report: F,
) -> Result<R, Error>
where
    T: Transport,
    F: FnOnce(&Session<'_, T>) -> Result<R, Error>,
{
    let wsdl = source.load()?;
    let client = SoapClient::new(&wsdl, transport, options)?;

    let session = client.login(&config.api_user, &config.api_key)?;
    let result = report(&session);
    session.close();

    result
}

/// `catalog_product_attribute_set.list`, optionally followed by
/// `catalog_product_attribute_set.info` for every set.
pub fn attribute_sets<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
    details: bool,
) -> Result<Summary, Error> {
    let response = session.call("catalog_product_attribute_set.list", Vec::new())?;
    let sets = flatten::attribute_sets(&response);

    let mut summary = Summary {
        rows: sets.records.len(),
        skipped: sets.skipped.len(),
    };

    if sets.records.is_empty() {
        warn!("no valid attribute sets returned");
        writeln!(out, "No valid attribute sets returned.")?;
        return Ok(summary);
    }

    let mut table = Table::new(&["Attribute Set ID", "Attribute Set Name"], ATTRIBUTE_SET_WIDTHS);
    for set in &sets.records {
        table.push(vec![set.set_id.clone(), set.name.clone()]);
    }

    writeln!(out, "Attribute Sets:")?;
    renderer.render(&table, out)?;

    if details {
        for set in &sets.records {
            let info = session.call(
                "catalog_product_attribute_set.info",
                vec![set.set_id.as_str().into()],
            );

            match info {
                Ok(info) => {
                    writeln!(out, "\nAttribute Set {} - {}:", set.set_id, set.name)?;
                    writeln!(out, "{}", serde_json::to_string_pretty(&info.to_json())?)?;
                }
                Err(err) => {
                    warn!(set_id = %set.set_id, "unable to read attribute set: {}", describe(&err));
                    summary.skipped += 1;
                }
            }
        }
    }

    info!(rows = summary.rows, skipped = summary.skipped, "listed attribute sets");
    Ok(summary)
}

/// Every attribute of every attribute set, once per code.
pub fn attributes<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
) -> Result<Summary, Error> {
    let sets = flatten::attribute_sets(&session.catalog_product_attribute_set_list()?);
    info!(count = sets.records.len(), "read attribute sets");

    let mut skipped = sets.skipped.len();
    let mut index = AttributeIndex::new();

    for set in &sets.records {
        info!(set_id = %set.set_id, name = %set.name, "reading attributes");

        let list = match session.catalog_product_attribute_list(&set.set_id) {
            Ok(list) => list,
            Err(err) => {
                warn!(set_id = %set.set_id, "unable to read attributes: {}", describe(&err));
                skipped += 1;
                continue;
            }
        };

        if list.as_sequence().is_err() {
            warn!(set_id = %set.set_id, "attribute list is a {}, not a list", list.kind());
            skipped += 1;
            continue;
        }

        let extraction = flatten::attributes(&list);
        skipped += extraction.skipped.len();
        index.extend(extraction.records);
    }

    info!(count = index.len(), "merged attributes");

    let mut table = Table::new(
        &["attribute_id", "code", "type", "required", "scope"],
        ATTRIBUTE_WIDTHS,
    );
    for attribute in index.into_vec() {
        table.push(attribute.row());
    }

    writeln!(out, "Attributes:")?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped,
    })
}

/// The category tree below `root`, with `catalog_category.info` for every
/// node, sorted by id.
pub fn categories<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
    root: &str,
    store: &str,
    tree_view: bool,
) -> Result<Summary, Error> {
    let tree = session.call("catalog_category.tree", vec![root.into(), store.into()])?;
    if tree.is_null() {
        return Err(Error::rpc(
            "catalog_category.tree",
            Error::EmptyCategoryTree(root.to_owned()),
        ));
    }

    if tree_view {
        let mut lines = Vec::new();
        flatten::walk_tree(&tree, &mut |node, depth| {
            lines.push(format!(
                "{}{} {}",
                "  ".repeat(depth),
                node.field("category_id"),
                node.field("name")
            ));
        });

        writeln!(out, "Category tree:")?;
        for line in lines {
            writeln!(out, "{}", line.trim_end())?;
        }
        writeln!(out)?;
    }

    let nodes = flatten::flatten_tree(&tree);
    info!(count = nodes.len(), "flattened category tree");

    let mut categories = Vec::with_capacity(nodes.len());
    let mut skipped = 0;

    for (index, node) in nodes.into_iter().enumerate() {
        let id = node.field("category_id");
        if id.is_empty() {
            warn!(
                "skipping {}",
                MalformedRecord {
                    index: index + 1,
                    reason: "tree node has no category_id".to_owned(),
                }
            );
            skipped += 1;
            continue;
        }

        let info = match session.call("catalog_category.info", vec![id.as_str().into(), store.into()]) {
            Ok(info) => info,
            Err(err) => {
                warn!(category_id = %id, "unable to read category: {}", describe(&err));
                skipped += 1;
                continue;
            }
        };

        match Category::from_value(&info) {
            Ok(category) => categories.push(category),
            Err(reason) => {
                warn!("skipping {}", MalformedRecord { index: index + 1, reason });
                skipped += 1;
            }
        }
    }

    flatten::sort_categories(&mut categories);

    let mut table = Table::new(&Category::COLUMNS, CATEGORY_WIDTHS);
    for category in &categories {
        table.push(category.row());
    }

    writeln!(out, "Categories (by category_id):")?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped,
    })
}

/// `store.list`.
pub fn stores<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
) -> Result<Summary, Error> {
    let stores = flatten::stores(&session.call("store.list", Vec::new())?);

    let mut table = Table::new(&Store::COLUMNS, STORE_WIDTHS);
    for store in &stores.records {
        table.push(store.row());
    }

    writeln!(out, "Stores:")?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped: stores.skipped.len(),
    })
}

/// Items of a list result. Null reads as an empty list.
fn list_items<'a>(operation: &str, list: &'a Value) -> Result<&'a [Value], Error> {
    match list {
        Value::Null => Ok(&[][..]),
        list => list
            .as_sequence()
            .map_err(|err| Error::rpc(operation, err.into())),
    }
}

/// `catalog_product.list`, with each product's `catalog_product.info`
/// overlaid when `details` is set. Products whose info cannot be read keep
/// their list fields.
pub fn products<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
    details: bool,
) -> Result<Summary, Error> {
    let list = session.call("catalog_product.list", Vec::new())?;
    let items = list_items("catalog_product.list", &list)?;

    let mut products = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        let product = match Product::from_value(item) {
            Ok(product) => product,
            Err(reason) => {
                warn!("skipping {}", MalformedRecord { index: index + 1, reason });
                skipped += 1;
                continue;
            }
        };

        if !details {
            products.push(product);
            continue;
        }

        let info = session.call(
            "catalog_product.info",
            vec![product.product_id.as_str().into()],
        );

        match info.map(|info| Product::with_info(item, &info)) {
            Ok(Ok(merged)) => products.push(merged),
            Ok(Err(reason)) => {
                warn!(product_id = %product.product_id, "product info is unusable: {}", reason);
                products.push(product);
            }
            Err(err) => {
                warn!(product_id = %product.product_id, "unable to read product: {}", describe(&err));
                products.push(product);
            }
        }
    }

    if products.is_empty() {
        writeln!(out, "No products returned.")?;
        return Ok(Summary { rows: 0, skipped });
    }

    flatten::sort_products(&mut products);

    let mut table = Table::new(&Product::COLUMNS, PRODUCT_WIDTHS);
    for product in &products {
        table.push(product.row());
    }

    writeln!(out, "Products (by product_id):")?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped,
    })
}

/// `product_attribute.list` for one attribute set, then
/// `product_attribute.info` for every attribute in it.
pub fn attribute_details<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
    set_id: &str,
) -> Result<Summary, Error> {
    let list = session.call("product_attribute.list", vec![set_id.into()])?;
    let items = list_items("product_attribute.list", &list)?;

    let mut details = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        let id = item.field("attribute_id");
        if id.is_empty() {
            warn!(
                "skipping {}",
                MalformedRecord {
                    index: index + 1,
                    reason: "attribute has no attribute_id".to_owned(),
                }
            );
            skipped += 1;
            continue;
        }

        let info = match session.call("product_attribute.info", vec![id.as_str().into()]) {
            Ok(info) => info,
            Err(err) => {
                warn!(attribute_id = %id, "unable to read attribute: {}", describe(&err));
                skipped += 1;
                continue;
            }
        };

        match AttributeDetail::from_value(&info) {
            Ok(detail) => details.push(detail),
            Err(reason) => {
                warn!("skipping {}", MalformedRecord { index: index + 1, reason });
                skipped += 1;
            }
        }
    }

    let mut table = Table::new(&AttributeDetail::COLUMNS, ATTRIBUTE_DETAIL_WIDTHS);
    for detail in &details {
        table.push(detail.row());
    }

    writeln!(out, "Attributes of set {}:", set_id)?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped,
    })
}

/// `catalog_category_attribute.list`, with the option labels of every
/// select attribute from `catalog_category_attribute.options`.
pub fn category_attributes<T: Transport>(
    session: &Session<'_, T>,
    renderer: &dyn Renderer,
    out: &mut dyn Write,
) -> Result<Summary, Error> {
    let extraction =
        flatten::category_attributes(&session.call("catalog_category_attribute.list", Vec::new())?);
    let mut attributes = extraction.records;

    for attribute in attributes.iter_mut().filter(|attribute| attribute.has_options()) {
        match session.call(
            "catalog_category_attribute.options",
            vec![attribute.code.as_str().into()],
        ) {
            Ok(options) => attribute.options = flatten::option_labels(&options),
            Err(err) => {
                warn!(code = %attribute.code, "unable to read options: {}", describe(&err));
            }
        }
    }

    flatten::sort_category_attributes(&mut attributes);

    let mut table = Table::new(&CategoryAttribute::COLUMNS, CATEGORY_ATTRIBUTE_WIDTHS);
    for attribute in &attributes {
        table.push(attribute.row());
    }

    writeln!(out, "Category attributes:")?;
    renderer.render(&table, out)?;

    Ok(Summary {
        rows: table.len(),
        skipped: extraction.skipped.len(),
    })
}
