use std::{io, path::PathBuf};

use structopt::StructOpt;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use magesoap::{
    render::{renderer_for, Capabilities},
    report::{self, Summary, Target},
    ClientOptions, Config, HttpTransport,
};

#[derive(Debug, Error)]
enum Error {
    #[error("Report failed")]
    ReportError(#[from] magesoap::Error),
}

#[derive(StructOpt)]
#[structopt(name = "magesoap", about = "Reports over the Magento SOAP API")]
struct Args {
    /// JSON file with magento_domain, api_user and api_key
    #[structopt(short, long, env = "MAGESOAP_CONFIG", default_value = "config.json", parse(from_os_str))]
    config: PathBuf,

    /// Load the WSDL from this URL or path instead of the configured server
    #[structopt(long)]
    wsdl: Option<String>,

    /// Print fixed-width columns instead of a grid
    #[structopt(long)]
    plain: bool,

    /// Log debug output
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// List attribute sets
    AttributeSets {
        /// Also dump each set's details as JSON
        #[structopt(long)]
        details: bool,
    },

    /// List the attributes of all attribute sets, once per code
    Attributes,

    /// List the categories below a root category
    Categories {
        /// Id of the root category
        #[structopt(long)]
        root: String,

        /// Store view to read names and URL keys in
        #[structopt(long, default_value = "default")]
        store: String,

        /// Also print the tree, indented by depth
        #[structopt(long)]
        tree: bool,
    },

    /// List store views
    Stores,

    /// List products, sorted by id
    Products {
        /// Also read each product's details
        #[structopt(long)]
        details: bool,
    },

    /// Show the details and options of every attribute in an attribute set
    AttributeDetails {
        /// Id of the attribute set
        #[structopt(long)]
        set: String,
    },

    /// List category attributes with their options
    CategoryAttributes,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "magesoap={level},magesoap_wsdl={level},magesoap_util={level}",
            level = level
        )
    }));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(args: Args) -> Result<Summary, magesoap::Error> {
    let config = Config::load(&args.config)?;

    let capabilities = Capabilities::probe(args.plain);
    let renderer = renderer_for(&capabilities);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let transport = HttpTransport::new();
    let options = ClientOptions::default();
    let wsdl = args.wsdl.as_deref();

    match args.command {
        Command::AttributeSets { details } => {
            let source = Target::ATTRIBUTE_SETS.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::attribute_sets(session, renderer.as_ref(), &mut out, details)
            })
        }

        Command::Attributes => {
            let source = Target::ATTRIBUTES.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::attributes(session, renderer.as_ref(), &mut out)
            })
        }

        Command::Categories { root, store, tree } => {
            let source = Target::CATEGORIES.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::categories(session, renderer.as_ref(), &mut out, &root, &store, tree)
            })
        }

        Command::Stores => {
            let source = Target::STORES.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::stores(session, renderer.as_ref(), &mut out)
            })
        }

        Command::Products { details } => {
            let source = Target::PRODUCTS.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::products(session, renderer.as_ref(), &mut out, details)
            })
        }

        Command::AttributeDetails { set } => {
            let source = Target::ATTRIBUTE_DETAILS.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::attribute_details(session, renderer.as_ref(), &mut out, &set)
            })
        }

        Command::CategoryAttributes => {
            let source = Target::CATEGORY_ATTRIBUTES.source(&config, wsdl)?;
            report::run(&config, &source, transport, options, |session| {
                report::category_attributes(session, renderer.as_ref(), &mut out)
            })
        }
    }
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    init_tracing(args.verbose);

    match run(args) {
        Ok(summary) => {
            info!(rows = summary.rows, skipped = summary.skipped, "done");
            Ok(())
        }
        Err(err) => {
            error!("{}", magesoap::describe(&err));
            Err(err.into())
        }
    }
}
