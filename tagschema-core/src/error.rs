/// Error type for schema building and document traversal.
///
/// Every variant aborts the call that produced it. A failure in the middle of
/// a traversal may leave the document or the object partially updated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Recursion went past the depth ceiling, usually a cyclic type graph.
    #[error("depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },

    /// A field type has neither a codec nor a binding table. Only raised by
    /// strict builders; the default policy skips the field.
    #[error("field `{owner}.{field}` has unresolvable type `{type_name}`")]
    UnresolvableFieldType {
        owner: &'static str,
        field: String,
        type_name: &'static str,
    },

    /// The schema does not describe the object it was handed.
    #[error("schema for `{schema}` does not match {detail}")]
    SchemaIntegrity {
        schema: &'static str,
        detail: String,
    },

    /// A field that must carry a value was empty.
    #[error("field `{field}` of `{owner}` has no value")]
    MissingRequiredValue { owner: &'static str, field: String },

    /// A value or document entry did not have the type its codec expects.
    #[error("type mismatch at `{key}`: expected {expected}, found {found}")]
    CodecTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A document snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl SchemaError {
    pub(crate) fn mismatch(key: &str, expected: &'static str, found: &'static str) -> Self {
        SchemaError::CodecTypeMismatch {
            key: key.to_string(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_site() {
        let err = SchemaError::mismatch("counter", "Int", "String");
        assert_eq!(
            err.to_string(),
            "type mismatch at `counter`: expected Int, found String"
        );

        let err = SchemaError::DepthExceeded { depth: 257, max: 256 };
        assert_eq!(err.to_string(), "depth 257 exceeds the maximum of 256");
    }
}
