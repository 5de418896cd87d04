//! Binding descriptors.
//!
//! A [`BindingSchema`] lists the fields of a target record in declaration
//! order. `#[derive(Bind)]` emits it as an associated `const`, so the
//! annotations are parsed once at compile time and every decode call walks
//! the same static descriptors.

use std::fmt;

use crate::resolve::ScalarKind;

/// Request part a field can be read from by key.
///
/// The declaration order is also the assignment priority: a value found in a
/// later source overwrites one from an earlier source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Router-resolved path variables.
    Path,
    /// URL query parameters.
    Query,
    /// Request headers.
    Header,
}

impl SourceKind {
    /// All sources in assignment priority order.
    pub const PRIORITY: [Self; 3] = [Self::Path, Self::Query, Self::Header];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
        }
    }
}

/// One `(source, key)` pair declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBinding {
    /// Where the value comes from.
    pub kind: SourceKind,
    /// Key looked up in that source.
    pub key: &'static str,
    /// For query sequences: repeated keys instead of one comma-joined value.
    pub explode: bool,
}

impl SourceBinding {
    /// A path variable binding.
    #[must_use]
    pub const fn path(key: &'static str) -> Self {
        Self {
            kind: SourceKind::Path,
            key,
            explode: false,
        }
    }

    /// A query parameter binding.
    #[must_use]
    pub const fn query(key: &'static str, explode: bool) -> Self {
        Self {
            kind: SourceKind::Query,
            key,
            explode,
        }
    }

    /// A header binding. Header names are matched case-insensitively.
    #[must_use]
    pub const fn header(key: &'static str) -> Self {
        Self {
            kind: SourceKind::Header,
            key,
            explode: false,
        }
    }
}

/// Semantic shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single scalar.
    Scalar(ScalarKind),
    /// A scalar that stays `None` unless a source supplies it.
    Optional(ScalarKind),
    /// An ordered sequence of scalars.
    Sequence(ScalarKind),
    /// A nested record that the walker recurses into.
    Record(&'static BindingSchema),
    /// A field only the body decoder fills.
    Opaque,
}

impl FieldKind {
    /// Returns true for shapes that path, query and header values can be
    /// assigned to.
    #[must_use]
    pub const fn accepts_sources(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Optional(_) | Self::Sequence(_))
    }

    /// Returns true for sequence shapes.
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Returns the element kind of scalar, optional and sequence shapes.
    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(k) | Self::Optional(k) | Self::Sequence(k) => Some(*k),
            Self::Record(_) | Self::Opaque => None,
        }
    }
}

/// Descriptor for one field of a target record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    /// Field name as declared.
    pub name: &'static str,
    /// Declared type, as written in the source.
    pub type_name: &'static str,
    /// Semantic shape.
    pub kind: FieldKind,
    /// Declared `(source, key)` pairs, in declaration order.
    pub sources: &'static [SourceBinding],
    /// Content type when the field is a body sink.
    pub body: Option<&'static str>,
    /// Key used by the structural body merge; `None` when the body decoder
    /// must leave the field alone.
    pub body_key: Option<&'static str>,
}

impl FieldBinding {
    /// Returns true if the field is a body sink.
    #[must_use]
    pub const fn is_body_sink(&self) -> bool {
        self.body.is_some()
    }

    /// Returns the declared sources of one kind, in declaration order.
    pub fn sources_of(&self, kind: SourceKind) -> impl Iterator<Item = &SourceBinding> {
        self.sources.iter().filter(move |s| s.kind == kind)
    }
}

/// Whether a schema describes a record the walker can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A record with named fields.
    Record,
    /// Anything else; decoding into it is rejected.
    Opaque,
}

/// Ordered field descriptors of a target type.
///
/// # Example
///
/// ```rust
/// use bindery::{BindingSchema, FieldBinding, FieldKind, ScalarKind, SourceBinding};
///
/// const SCHEMA: BindingSchema = BindingSchema::record(
///     "Lookup",
///     &[FieldBinding {
///         name: "id",
///         type_name: "u64",
///         kind: FieldKind::Scalar(ScalarKind::U64),
///         sources: &[SourceBinding::path("id")],
///         body: None,
///         body_key: Some("id"),
///     }],
/// );
///
/// assert!(SCHEMA.is_record());
/// assert_eq!(SCHEMA.field("id").map(|f| f.type_name), Some("u64"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSchema {
    type_name: &'static str,
    target: TargetKind,
    fields: &'static [FieldBinding],
}

impl BindingSchema {
    /// Describes a record type.
    #[must_use]
    pub const fn record(type_name: &'static str, fields: &'static [FieldBinding]) -> Self {
        Self {
            type_name,
            target: TargetKind::Record,
            fields,
        }
    }

    /// Describes a type that is not a record.
    #[must_use]
    pub const fn opaque(type_name: &'static str) -> Self {
        Self {
            type_name,
            target: TargetKind::Opaque,
            fields: &[],
        }
    }

    /// Returns the target type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the schema describes a record.
    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self.target, TargetKind::Record)
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &'static [FieldBinding] {
        self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldBinding> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the dotted paths of every body sink, nested records included,
    /// in walk order.
    #[must_use]
    pub fn body_sinks(&self) -> Vec<String> {
        let mut sinks = Vec::new();
        self.collect_sinks("", &mut sinks);
        sinks
    }

    fn collect_sinks(&self, prefix: &str, sinks: &mut Vec<String>) {
        for field in self.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{prefix}.{}", field.name)
            };
            if let FieldKind::Record(nested) = field.kind {
                nested.collect_sinks(&path, sinks);
            }
            if field.is_body_sink() {
                sinks.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: BindingSchema = BindingSchema::record(
        "Inner",
        &[FieldBinding {
            name: "state",
            type_name: "String",
            kind: FieldKind::Opaque,
            sources: &[],
            body: None,
            body_key: Some("state"),
        }],
    );

    const OUTER: BindingSchema = BindingSchema::record(
        "Outer",
        &[
            FieldBinding {
                name: "request",
                type_name: "Inner",
                kind: FieldKind::Record(&INNER),
                sources: &[],
                body: Some("application/json"),
                body_key: Some("request"),
            },
            FieldBinding {
                name: "ids",
                type_name: "Vec<String>",
                kind: FieldKind::Sequence(ScalarKind::Text),
                sources: &[
                    SourceBinding::header("X-Id"),
                    SourceBinding::query("id", true),
                    SourceBinding::path("id"),
                ],
                body: None,
                body_key: None,
            },
        ],
    );

    #[test]
    fn test_field_lookup() {
        let ids = OUTER.field("ids").unwrap();
        assert!(ids.kind.is_sequence());
        assert!(ids.kind.accepts_sources());
        assert!(!ids.is_body_sink());
        assert!(OUTER.field("missing").is_none());
    }

    #[test]
    fn test_sources_of_filters_by_kind() {
        let ids = OUTER.field("ids").unwrap();
        let query: Vec<_> = ids.sources_of(SourceKind::Query).collect();
        assert_eq!(query.len(), 1);
        assert!(query[0].explode);
        assert_eq!(ids.sources_of(SourceKind::Header).next().unwrap().key, "X-Id");
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            SourceKind::PRIORITY,
            [SourceKind::Path, SourceKind::Query, SourceKind::Header]
        );
        assert!(SourceKind::Path < SourceKind::Header);
    }

    #[test]
    fn test_body_sinks() {
        assert_eq!(OUTER.body_sinks(), vec!["request".to_string()]);
        assert!(INNER.body_sinks().is_empty());
    }

    #[test]
    fn test_opaque_schema() {
        let schema = BindingSchema::opaque("u32");
        assert!(!schema.is_record());
        assert!(schema.fields().is_empty());
        assert_eq!(schema.type_name(), "u32");
    }
}
