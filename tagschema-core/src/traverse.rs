//! Schema-driven reads and writes between documents and objects.
//!
//! Both passes walk the same schema, so whatever shape is read is the shape
//! written back. Sub-documents are created on demand in both directions.

use std::any::Any;

use tracing::trace;

use crate::binding::Link;
use crate::document::Document;
use crate::error::SchemaError;
use crate::schema::{Schema, check_depth};

/// Populates `object` from `doc`.
///
/// Missing sub-documents are inserted empty, and empty optional sub-objects
/// are filled with a default instance before being read into.
pub fn read(doc: &mut Document, schema: &Schema, object: &mut dyn Any) -> Result<(), SchemaError> {
    read_at(doc, schema, object, 1)
}

/// Stores every field of `object` into `doc`.
pub fn write(doc: &mut Document, schema: &Schema, object: &dyn Any) -> Result<(), SchemaError> {
    write_at(doc, schema, object, 1)
}

fn read_at(
    doc: &mut Document,
    schema: &Schema,
    object: &mut dyn Any,
    depth: usize,
) -> Result<(), SchemaError> {
    check_depth(depth)?;
    check_owner(schema, (*object).type_id())?;

    for (key, codec) in &schema.nodes {
        let link = link_for(schema, &schema.node_links, key)?;
        trace!(key = %key, depth, "read node");
        let value = codec.read(doc, key)?;
        link.set(object, value)?;
    }

    for (key, sub_schema) in &schema.subschemas {
        let link = link_for(schema, &schema.subschema_links, key)?;
        trace!(key = %key, depth, "read sub-schema");
        let sub_doc = doc.compound_entry(key)?;
        match link.get_mut(object)? {
            Some(current) => read_at(sub_doc, sub_schema, current, depth + 1)?,
            None => {
                let mut fresh = link.fresh();
                read_at(sub_doc, sub_schema, &mut *fresh, depth + 1)?;
                link.set(object, fresh)?;
            }
        }
    }

    Ok(())
}

fn write_at(
    doc: &mut Document,
    schema: &Schema,
    object: &dyn Any,
    depth: usize,
) -> Result<(), SchemaError> {
    check_depth(depth)?;
    check_owner(schema, (*object).type_id())?;

    for (key, codec) in &schema.nodes {
        let link = link_for(schema, &schema.node_links, key)?;
        let value = link.get(object)?.ok_or_else(|| missing(schema, key))?;
        trace!(key = %key, depth, "write node");
        codec.write(doc, key, value)?;
    }

    for (key, sub_schema) in &schema.subschemas {
        let link = link_for(schema, &schema.subschema_links, key)?;
        let sub_doc = doc.compound_entry(key)?;
        let value = link.get(object)?.ok_or_else(|| missing(schema, key))?;
        trace!(key = %key, depth, "write sub-schema");
        write_at(sub_doc, sub_schema, value, depth + 1)?;
    }

    Ok(())
}

fn check_owner(schema: &Schema, actual: std::any::TypeId) -> Result<(), SchemaError> {
    if actual != schema.type_id {
        return Err(SchemaError::SchemaIntegrity {
            schema: schema.type_name,
            detail: "an object of another type".to_string(),
        });
    }
    Ok(())
}

fn link_for<'s>(
    schema: &Schema,
    links: &'s indexmap::IndexMap<String, Link>,
    key: &str,
) -> Result<&'s Link, SchemaError> {
    links.get(key).ok_or_else(|| SchemaError::SchemaIntegrity {
        schema: schema.type_name,
        detail: format!("its own key `{key}`, which has no field accessor"),
    })
}

fn missing(schema: &Schema, key: &str) -> SchemaError {
    SchemaError::MissingRequiredValue {
        owner: schema.type_name,
        field: key.to_string(),
    }
}
