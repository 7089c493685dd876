//! # ldap-schema-sync
//!
//! Upserts attributeType and objectClass definitions into a named schema entry
//! of an OpenLDAP `cn=config` tree.
//!
//! ## Usage
//!
//! ```bash
//! # Local server over ldapi:// with SASL EXTERNAL
//! ldap-schema-sync -n nextcloud \
//!     -a "( 1.3.6.1.4.1.99999.1 NAME 'nextcloudQuota' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 )" \
//!     -c "( 1.3.6.1.4.1.99999.2 NAME 'nextcloudUser' AUXILIARY MAY ( nextcloudQuota ) )"
//!
//! # Remote server, definitions from files, preview only
//! ldap-schema-sync -s ldaps://ldap.example.org -D cn=admin,cn=config -W secret \
//!     -n nextcloud --attrs-file attrs.txt --objs-file objs.txt --dry-run
//!
//! # Definitions from a schema LDIF, machine-readable report
//! ldap-schema-sync -n nextcloud --ldif-file nextcloud.ldif --json
//! ```
//!
//! Exits with status 1 when the input cannot be read, no definitions were
//! given, the bind fails, or the schema entry cannot be found or created.
//! Failures on individual definitions are printed to stderr and do not change
//! the exit status.

use clap::Parser;
use ldap_schema_sync::config::{DEFAULT_SCHEMA_BASE_DN, DEFAULT_SERVER_URI};
use ldap_schema_sync::input::{load_definitions_file, load_schema_ldif};
use ldap_schema_sync::sync::ContainerStatus;
use ldap_schema_sync::{
    DefinitionSet, LdapDirectory, SchemaDefinition, SchemaKind, SchemaSynchronizer, SyncConfig,
    SyncError, SyncReport,
};
use std::path::PathBuf;
use std::process;

/// Synchronize LDAP schema definitions into cn=schema,cn=config
#[derive(Parser, Debug)]
#[command(name = "ldap-schema-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// LDAP server URI
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_URI)]
    server_uri: String,

    /// Bind DN (empty uses SASL EXTERNAL on ldapi://)
    #[arg(short = 'D', long, default_value = "")]
    bind_dn: String,

    /// Bind password
    #[arg(short = 'W', long, default_value = "")]
    bind_pw: String,

    /// Schema name, e.g. nextcloud
    #[arg(short = 'n', long)]
    schema_name: String,

    /// attributeType definition (repeatable)
    #[arg(short = 'a', long = "attribute-type")]
    attribute_types: Vec<String>,

    /// objectClass definition (repeatable)
    #[arg(short = 'c', long = "object-class")]
    object_classes: Vec<String>,

    /// File with one attributeType definition per line
    #[arg(long)]
    attrs_file: Vec<PathBuf>,

    /// File with one objectClass definition per line
    #[arg(long)]
    objs_file: Vec<PathBuf>,

    /// Schema LDIF to take definitions from (repeatable)
    #[arg(long)]
    ldif_file: Vec<PathBuf>,

    /// Parent DN of the schema entries
    #[arg(long, default_value = DEFAULT_SCHEMA_BASE_DN)]
    base_dn: String,

    /// Show what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn collect_definitions(args: &Args) -> Result<DefinitionSet, SyncError> {
    let mut definitions = DefinitionSet::new();
    definitions.extend(
        args.attribute_types
            .iter()
            .map(|text| SchemaDefinition::attribute_type(text.as_str())),
    );
    definitions.extend(
        args.object_classes
            .iter()
            .map(|text| SchemaDefinition::object_class(text.as_str())),
    );
    for path in &args.attrs_file {
        definitions.extend(load_definitions_file(path, SchemaKind::AttributeType)?);
    }
    for path in &args.objs_file {
        definitions.extend(load_definitions_file(path, SchemaKind::ObjectClass)?);
    }
    for path in &args.ldif_file {
        definitions.extend(load_schema_ldif(path)?);
    }
    Ok(definitions)
}

fn print_report(report: &SyncReport) {
    match report.container_status {
        ContainerStatus::Existing => println!(
            "Using existing schema index {{{}}} for '{}'",
            report.container_ordinal, report.schema_name
        ),
        ContainerStatus::Created => println!("Created schema entry {}", report.container_dn),
        ContainerStatus::Planned => {
            println!("Would create schema entry {}", report.container_dn)
        }
    }

    for result in &report.results {
        if result.outcome.is_failure() {
            eprintln!("{}", result.status_line());
        } else {
            println!("{}", result.status_line());
        }
    }
}

async fn run(args: &Args, definitions: &DefinitionSet) -> Result<SyncReport, SyncError> {
    let config = SyncConfig::builder(&args.schema_name)
        .with_server_uri(&args.server_uri)
        .with_bind(&args.bind_dn, &args.bind_pw)
        .with_base_dn(&args.base_dn)
        .dry_run(args.dry_run)
        .build()?;

    let directory = LdapDirectory::connect(&config.server_uri, &config.bind_dn, &config.bind_password)
        .await
        .map_err(SyncError::Auth)?;

    let synchronizer = SchemaSynchronizer::new(directory, config);
    let report = synchronizer.sync(definitions).await;

    if let Err(e) = synchronizer.into_directory().unbind().await {
        log::debug!("Unbind failed: {}", e);
    }
    report
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let definitions = match collect_definitions(&args) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    };
    if definitions.is_empty() {
        let e = SyncError::NoDefinitions;
        eprintln!("{}", e);
        process::exit(e.exit_code());
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let report = match runtime.block_on(run(&args, &definitions)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_report(&report);
    }
}
