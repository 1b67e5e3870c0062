//! Command-line definitions.

use clap::{Args, Parser, Subcommand};
use mstore_domain::config::CodecKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Inspect and edit a file-backed metastore")]
pub struct Cli {
    /// Directory holding the store. Overrides `root` from the config file.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file (TOML, JSON or YAML). `MSTORE__*` environment variables still apply.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Document encoding. Overrides `store.codec` from the config file.
    #[arg(long, global = true)]
    pub codec: Option<CodecKind>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage namespaces
    Namespace {
        #[command(subcommand)]
        action: NamespaceAction,
    },
    /// Manage element types of a namespace
    Type {
        #[command(subcommand)]
        action: TypeAction,
    },
    /// Manage elements of an element type
    Element {
        #[command(subcommand)]
        action: ElementAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum NamespaceAction {
    List,
    Create { name: String },
    Delete { name: String },
    /// Prints `true` or `false`
    Exists { name: String },
}

#[derive(Debug, Subcommand)]
pub enum TypeAction {
    List { namespace: String },
    /// Prints the element type as JSON, looked up by case-insensitive name
    Show { namespace: String, name: String },
    Create {
        namespace: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { namespace: String, name: String },
}

#[derive(Debug, Args)]
pub struct TypeRef {
    pub namespace: String,
    #[arg(value_name = "TYPE")]
    pub element_type: String,
}

#[derive(Debug, Subcommand)]
pub enum ElementAction {
    List {
        #[command(flatten)]
        target: TypeRef,
        /// Fail on the first unreadable document instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Prints the element as JSON, looked up by case-insensitive name
    Get {
        #[command(flatten)]
        target: TypeRef,
        name: String,
    },
    /// Creates the element, or rewrites it if it already exists
    Put {
        #[command(flatten)]
        target: TypeRef,
        name: String,
        #[arg(long)]
        value: Option<String>,
        /// Top-level attribute as `key=value`; repeatable
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
    },
    Delete {
        #[command(flatten)]
        target: TypeRef,
        id: String,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}
