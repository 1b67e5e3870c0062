//! Command handlers. Results are written to the supplied writer, diagnostics go to tracing.

use crate::args::{Command, ElementAction, NamespaceAction, TypeAction, TypeRef};
use anyhow::{Context, Result, anyhow};
use mstore::{MetaStore, MetaStoreError};
use mstore_domain::{Attribute, Element, ElementType};
use mstore_vfs::FileSystem;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

pub async fn run<F: FileSystem>(
    store: &MetaStore<F>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Namespace { action } => namespace(store, action, out).await,
        Command::Type { action } => element_type(store, action, out).await,
        Command::Element { action } => element(store, action, out).await,
    }
}

async fn namespace<F: FileSystem>(
    store: &MetaStore<F>,
    action: NamespaceAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        NamespaceAction::List => {
            let mut namespaces = store.list_namespaces().await?;
            namespaces.sort();
            write_lines(out, &namespaces)
        },
        NamespaceAction::Create { name } => Ok(store.create_namespace(&name).await?),
        NamespaceAction::Delete { name } => Ok(store.delete_namespace(&name).await?),
        NamespaceAction::Exists { name } => {
            let exists = store.namespace_exists(&name).await?;
            writeln!(out, "{exists}")?;
            Ok(())
        },
    }
}

async fn element_type<F: FileSystem>(
    store: &MetaStore<F>,
    action: TypeAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        TypeAction::List { namespace } => {
            let mut names: Vec<_> =
                store.list_element_types(&namespace).await?.into_iter().map(|t| t.name).collect();
            names.sort();
            write_lines(out, &names)
        },
        TypeAction::Show { namespace, name } => {
            let found = require_type(store, &namespace, &name).await?;
            write_json(out, &found)
        },
        TypeAction::Create { namespace, name, description } => {
            let mut new_type = ElementType::new(&namespace, name);
            new_type.description = description;
            let created = store.create_element_type(&namespace, new_type).await?;
            write_json(out, &created)
        },
        TypeAction::Delete { namespace, name } => {
            let Some(found) = store.element_type_by_name(&namespace, &name).await? else {
                return Ok(());
            };
            Ok(store.delete_element_type(&namespace, &found).await?)
        },
    }
}

async fn element<F: FileSystem>(
    store: &MetaStore<F>,
    action: ElementAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        ElementAction::List { target, strict } => {
            let owner = require_type(store, &target.namespace, &target.element_type).await?;
            let elements = if strict {
                store.list_elements(&target.namespace, &owner).await?
            } else {
                let mut errors = Vec::new();
                let elements =
                    store.list_elements_collecting(&target.namespace, &owner, &mut errors).await?;
                for err in &errors {
                    warn!(error = %err, "Skipped unreadable element");
                }
                elements
            };
            let mut names: Vec<_> = elements.into_iter().map(|e| e.name).collect();
            names.sort();
            write_lines(out, &names)
        },
        ElementAction::Get { target, name } => {
            let owner = require_type(store, &target.namespace, &target.element_type).await?;
            let found = store
                .element_by_name(&target.namespace, &owner, &name)
                .await?
                .ok_or_else(|| missing("element", &name, &target))?;
            write_json(out, &found)
        },
        ElementAction::Put { target, name, value, attributes } => {
            let owner = require_type(store, &target.namespace, &target.element_type).await?;
            let mut element = Element::new(&name);
            element.value = value;
            element.children =
                attributes.into_iter().map(|(key, value)| Attribute::new(key, value)).collect();

            // Create first: an existing document turns into an update within the same call.
            let stored = match store.create_element(&target.namespace, &owner, element.clone()).await {
                Err(MetaStoreError::ElementExists { .. }) => {
                    store.update_element(&target.namespace, &owner, &name, element).await?
                },
                created => created?,
            };
            write_json(out, &stored)
        },
        ElementAction::Delete { target, id } => {
            let owner = require_type(store, &target.namespace, &target.element_type).await?;
            Ok(store.delete_element(&target.namespace, &owner, &id).await?)
        },
    }
}

async fn require_type<F: FileSystem>(
    store: &MetaStore<F>,
    namespace: &str,
    name: &str,
) -> Result<ElementType> {
    store
        .element_type_by_name(namespace, name)
        .await?
        .ok_or_else(|| anyhow!("element type '{name}' not found in namespace '{namespace}'"))
}

fn missing(what: &str, name: &str, target: &TypeRef) -> anyhow::Error {
    anyhow!("{what} '{name}' not found in {}/{}", target.namespace, target.element_type)
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    writeln!(out, "{json}")?;
    Ok(())
}
