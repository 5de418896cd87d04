//! Recursive struct walker.
//!
//! [`Bind::bind_fields`] is the typed half of a binding: it visits each field
//! of a record in declaration order and hands it to the [`StructWalker`]
//! together with the field's static [`FieldBinding`]. The walker owns the
//! untyped half: looking keys up in the request, applying the fixed source
//! priority, buffering the body and tracking whether a body sink consumed it.
//!
//! `#[derive(Bind)]` generates `bind_fields`; hand-written impls call the same
//! walker methods.

use std::io;
use std::time::Instant;

use bytes::Bytes;

use crate::body::{decode_body, MergeBody};
use crate::context::{Body, RequestSnapshot};
use crate::resolve::{BindValue, Encoding, ResolveError, ScalarKind};
use crate::schema::{BindingSchema, FieldBinding, SourceBinding, SourceKind};
use crate::{BindError, DecodeOptions};

/// A record type the walker can bind a request into.
///
/// Usually derived:
///
/// ```rust
/// use bindery::Bind;
///
/// #[derive(Debug, Clone, Default, Bind)]
/// struct Lookup {
///     #[bind(path = "name")]
///     name: String,
///     #[bind(query = "game")]
///     game: String,
///     state: String,
/// }
///
/// assert_eq!(Lookup::SCHEMA.fields().len(), 3);
/// assert_eq!(Lookup::SCHEMA.body_sinks(), Vec::<String>::new());
/// ```
pub trait Bind: MergeBody {
    /// Field descriptors, in declaration order.
    const SCHEMA: BindingSchema;

    /// Visits every field with the walker, in declaration order.
    ///
    /// # Errors
    ///
    /// Propagates the first error the walker reports; fields visited before
    /// the failure keep their new values.
    fn bind_fields(&mut self, walker: &mut StructWalker<'_>) -> Result<(), BindError>;
}

enum BodyState {
    Pending(Body),
    Buffered(Bytes),
}

/// Walks one request into one target record.
///
/// Created by [`crate::Decoder`] for a single decode call.
pub struct StructWalker<'a> {
    request: &'a RequestSnapshot,
    options: &'a DecodeOptions,
    body: BodyState,
    path: Vec<&'static str>,
    consumed_body: bool,
    sinks_reached: usize,
}

impl<'a> StructWalker<'a> {
    /// Creates a walker over `request`; `body` is the payload taken out of it.
    #[must_use]
    pub fn new(request: &'a RequestSnapshot, body: Body, options: &'a DecodeOptions) -> Self {
        Self {
            request,
            options,
            body: BodyState::Pending(body),
            path: Vec::new(),
            consumed_body: false,
            sinks_reached: 0,
        }
    }

    /// Walks the fields of `target` and returns whether a body sink was
    /// consumed anywhere inside it.
    ///
    /// # Errors
    ///
    /// Returns the first field error.
    pub fn visit_record<T: Bind>(&mut self, target: &mut T) -> Result<bool, BindError> {
        let outer = std::mem::replace(&mut self.consumed_body, false);
        target.bind_fields(self)?;
        let inner = self.consumed_body;
        self.consumed_body = outer || inner;
        Ok(inner)
    }

    /// Returns true once a body sink has been reached during this walk.
    #[must_use]
    pub fn consumed_body(&self) -> bool {
        self.consumed_body
    }

    /// Assigns `slot` from the field's path, query and header sources.
    ///
    /// Sources are applied in the order path, query, header; within one kind
    /// they are applied in declaration order. Each present value overwrites
    /// the previous one and an absent key leaves `slot` untouched.
    ///
    /// # Errors
    ///
    /// `UnsupportedFieldType` if the descriptor is not a scalar shape,
    /// `MalformedValue` if a present value fails to parse.
    pub fn bind_value<V: BindValue>(
        &mut self,
        field: &'static FieldBinding,
        slot: &mut V,
    ) -> Result<(), BindError> {
        let Some(kind) = field.kind.scalar_kind() else {
            return Err(self.unsupported(field));
        };
        let sequence = field.kind.is_sequence();

        for origin in SourceKind::PRIORITY {
            for binding in field.sources_of(origin) {
                let Some(raw) = self.occurrences(field, binding, kind, sequence)? else {
                    continue;
                };
                *slot = V::resolve(&raw).map_err(|cause| {
                    BindError::malformed_value(
                        self.field_path(field.name),
                        origin,
                        field.type_name,
                        cause,
                    )
                })?;
                tracing::trace!(
                    field = %self.field_path(field.name),
                    source = %origin,
                    key = binding.key,
                    "field bound"
                );
            }
        }
        Ok(())
    }

    /// Recurses into a nested record.
    ///
    /// The nested record is walked before any body annotation on the field
    /// itself is honoured. Its body sinks count for the enclosing record.
    ///
    /// # Errors
    ///
    /// `UnsupportedFieldType` if the field also declares path, query or
    /// header sources, or if the nested type is not a record.
    pub fn descend<T: Bind>(
        &mut self,
        field: &'static FieldBinding,
        nested: &mut T,
    ) -> Result<(), BindError> {
        if !field.sources.is_empty() || !T::SCHEMA.is_record() {
            return Err(self.unsupported(field));
        }
        self.path.push(field.name);
        let consumed = self.visit_record(nested)?;
        self.path.pop();
        if consumed {
            tracing::trace!(field = %self.field_path(field.name), "nested record consumed body");
        }
        Ok(())
    }

    /// Decodes the request body into a body-sink field.
    ///
    /// The payload is decoded with the content type declared on the field,
    /// not the one sent with the request.
    ///
    /// # Errors
    ///
    /// `MalformedBody` if the payload does not fit the field,
    /// `PayloadTooLarge` or `Io` if the body cannot be read.
    pub fn bind_body<B: MergeBody + ?Sized>(
        &mut self,
        field: &'static FieldBinding,
        slot: &mut B,
    ) -> Result<(), BindError> {
        if !field.sources.is_empty() && !field.kind.accepts_sources() {
            return Err(self.unsupported(field));
        }
        let Some(content_type) = field.body else {
            return Ok(());
        };

        self.consumed_body = true;
        self.sinks_reached += 1;
        let path = self.field_path(field.name);
        if self.sinks_reached > 1 {
            tracing::warn!(
                field = %path,
                sinks = self.sinks_reached,
                "multiple body sinks; reusing the buffered payload"
            );
        }

        let bytes = self.buffered_body()?;
        decode_body(&bytes, Some(content_type), &self.options.json_media_types, slot)?;
        tracing::debug!(field = %path, content_type, len = bytes.len(), "body sink consumed");
        Ok(())
    }

    /// Checks a field the walker does not assign itself.
    ///
    /// # Errors
    ///
    /// `UnsupportedFieldType` if the field declares path, query or header
    /// sources its shape cannot take.
    pub fn skip(&mut self, field: &'static FieldBinding) -> Result<(), BindError> {
        if !field.sources.is_empty() && !field.kind.accepts_sources() {
            return Err(self.unsupported(field));
        }
        Ok(())
    }

    /// Returns the buffered request body, reading it on first use.
    ///
    /// # Errors
    ///
    /// `Io` if the deadline has elapsed or the reader fails,
    /// `PayloadTooLarge` if the body exceeds the configured limit.
    pub fn buffered_body(&mut self) -> Result<Bytes, BindError> {
        let body = match &mut self.body {
            BodyState::Buffered(bytes) => return Ok(bytes.clone()),
            BodyState::Pending(body) => std::mem::take(body),
        };
        self.body = BodyState::Buffered(Bytes::new());

        if matches!(body, Body::Empty) {
            return Ok(Bytes::new());
        }
        if let Some(deadline) = self.request.deadline() {
            if Instant::now() >= deadline {
                return Err(BindError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "deadline elapsed before the request body was read",
                )));
            }
        }

        let limit = self.options.max_body_size;
        let bytes = body
            .read_to_end(limit)?
            .map_err(|actual| BindError::PayloadTooLarge { limit, actual })?;
        tracing::trace!(len = bytes.len(), "request body buffered");
        self.body = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Drains the request body without buffering it.
    ///
    /// Used when the payload is going to be ignored, so the size limit does
    /// not apply. After the deadline the body is dropped unread. Returns the
    /// number of bytes drained.
    ///
    /// # Errors
    ///
    /// `Io` if the reader fails.
    pub fn discard_body(&mut self) -> Result<u64, BindError> {
        let body = match &mut self.body {
            BodyState::Buffered(bytes) => {
                return Ok(u64::try_from(bytes.len()).unwrap_or(u64::MAX))
            }
            BodyState::Pending(body) => std::mem::take(body),
        };
        self.body = BodyState::Buffered(Bytes::new());

        if let Some(deadline) = self.request.deadline() {
            if Instant::now() >= deadline {
                tracing::trace!("deadline elapsed; dropping request body unread");
                return Ok(0);
            }
        }
        body.discard().map_err(BindError::Io)
    }

    fn occurrences(
        &self,
        field: &FieldBinding,
        binding: &SourceBinding,
        kind: ScalarKind,
        sequence: bool,
    ) -> Result<Option<Vec<&'a str>>, BindError> {
        let request = self.request;
        let raw = match binding.kind {
            SourceKind::Path => request.path_vars().get(binding.key).map(|value| {
                if sequence {
                    Encoding::Joined.split(&[value])
                } else {
                    vec![value]
                }
            }),
            SourceKind::Query => request.query().get_all(binding.key).map(|values| {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                if sequence {
                    Encoding::from_explode(binding.explode).split(&values)
                } else {
                    values
                }
            }),
            SourceKind::Header => {
                let mut values = Vec::new();
                for value in request.headers().get_all(binding.key) {
                    let text = std::str::from_utf8(value.as_bytes()).map_err(|_| {
                        BindError::malformed_value(
                            self.field_path(field.name),
                            SourceKind::Header,
                            field.type_name,
                            ResolveError::new(
                                kind,
                                String::from_utf8_lossy(value.as_bytes()),
                                "header value is not valid UTF-8",
                            ),
                        )
                    })?;
                    values.push(text);
                }
                match values.first() {
                    None => None,
                    Some(first) if !sequence && first.is_empty() => None,
                    Some(_) => Some(values),
                }
            }
        };
        Ok(raw)
    }

    fn field_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            return name.to_string();
        }
        let mut path = self.path.join(".");
        path.push('.');
        path.push_str(name);
        path
    }

    fn unsupported(&self, field: &FieldBinding) -> BindError {
        BindError::UnsupportedFieldType {
            field: self.field_path(field.name),
            type_name: field.type_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{object_or_null, JsonError, JsonValue};
    use crate::schema::FieldKind;

    #[derive(Debug, Default)]
    struct Ticket {
        id: u32,
        tags: Vec<String>,
        label: Option<String>,
    }

    const TICKET_FIELDS: &[FieldBinding] = &[
        FieldBinding {
            name: "id",
            type_name: "u32",
            kind: FieldKind::Scalar(ScalarKind::U32),
            sources: &[
                SourceBinding::header("X-Id"),
                SourceBinding::query("id", false),
                SourceBinding::path("id"),
            ],
            body: None,
            body_key: Some("id"),
        },
        FieldBinding {
            name: "tags",
            type_name: "Vec<String>",
            kind: FieldKind::Sequence(ScalarKind::Text),
            sources: &[SourceBinding::header("X-Tag")],
            body: None,
            body_key: Some("tags"),
        },
        FieldBinding {
            name: "label",
            type_name: "Option<String>",
            kind: FieldKind::Optional(ScalarKind::Text),
            sources: &[SourceBinding::header("X-Label")],
            body: None,
            body_key: Some("label"),
        },
    ];

    impl MergeBody for Ticket {
        fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
            let Some(mut object) = object_or_null(value, "Ticket")? else {
                return Ok(());
            };
            if let Some(v) = object.remove("id") {
                self.id.merge_json(v)?;
            }
            Ok(())
        }
    }

    impl Bind for Ticket {
        const SCHEMA: BindingSchema = BindingSchema::record("Ticket", TICKET_FIELDS);

        fn bind_fields(&mut self, walker: &mut StructWalker<'_>) -> Result<(), BindError> {
            let fields = Self::SCHEMA.fields();
            walker.bind_value(&fields[0], &mut self.id)?;
            walker.bind_value(&fields[1], &mut self.tags)?;
            walker.bind_value(&fields[2], &mut self.label)?;
            Ok(())
        }
    }

    fn walk(request: &mut RequestSnapshot, ticket: &mut Ticket) -> Result<bool, BindError> {
        let options = DecodeOptions::default();
        let body = request.take_body();
        let mut walker = StructWalker::new(request, body, &options);
        walker.visit_record(ticket)
    }

    #[test]
    fn test_priority_ignores_declaration_order() {
        let mut request = RequestSnapshot::builder()
            .uri("/ticket?id=2".parse().unwrap())
            .path_var("id", "1")
            .header("x-id", "3")
            .build();
        let mut ticket = Ticket::default();

        let consumed = walk(&mut request, &mut ticket).unwrap();
        assert!(!consumed);
        assert_eq!(ticket.id, 3);
    }

    #[test]
    fn test_header_sequence_keeps_order() {
        let mut request = RequestSnapshot::builder()
            .header("X-Tag", "b")
            .header("X-Tag", "a")
            .header("X-Tag", "c")
            .build();
        let mut ticket = Ticket::default();

        walk(&mut request, &mut ticket).unwrap();
        assert_eq!(ticket.tags, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_header_is_absent_for_scalars() {
        let mut request = RequestSnapshot::builder().header("X-Label", "").build();
        let mut ticket = Ticket::default();

        walk(&mut request, &mut ticket).unwrap();
        assert_eq!(ticket.label, None);
    }

    #[test]
    fn test_malformed_value_names_field_and_source() {
        let mut request = RequestSnapshot::builder()
            .uri("/ticket?id=seven".parse().unwrap())
            .build();
        let mut ticket = Ticket::default();

        let err = walk(&mut request, &mut ticket).unwrap_err();
        match err {
            BindError::MalformedValue {
                field,
                origin,
                type_name,
                cause,
            } => {
                assert_eq!(field, "id");
                assert_eq!(origin, SourceKind::Query);
                assert_eq!(type_name, "u32");
                assert_eq!(cause.raw(), "seven");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_header_is_malformed() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-id", http::HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        let mut request = RequestSnapshot::builder().headers(headers).build();
        let mut ticket = Ticket::default();

        let err = walk(&mut request, &mut ticket).unwrap_err();
        assert!(matches!(
            err,
            BindError::MalformedValue {
                origin: SourceKind::Header,
                ..
            }
        ));
    }

    #[test]
    fn test_utf8_header_passes_through() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            "x-label",
            http::HeaderValue::from_bytes("José".as_bytes()).unwrap(),
        );
        headers.append(
            "x-tag",
            http::HeaderValue::from_bytes("größe".as_bytes()).unwrap(),
        );
        let mut request = RequestSnapshot::builder().headers(headers).build();
        let mut ticket = Ticket::default();

        walk(&mut request, &mut ticket).unwrap();
        assert_eq!(ticket.label.as_deref(), Some("José"));
        assert_eq!(ticket.tags, vec!["größe"]);
    }

    #[test]
    fn test_body_is_buffered_once() {
        let mut request = RequestSnapshot::builder().body("payload").build();
        let options = DecodeOptions::default();
        let body = request.take_body();
        let mut walker = StructWalker::new(&request, body, &options);

        assert_eq!(&walker.buffered_body().unwrap()[..], b"payload");
        assert_eq!(&walker.buffered_body().unwrap()[..], b"payload");
    }

    #[test]
    fn test_oversized_body() {
        let mut request = RequestSnapshot::builder().body(vec![b'x'; 32]).build();
        let options = DecodeOptions::default().max_body_size(8);
        let body = request.take_body();
        let mut walker = StructWalker::new(&request, body, &options);

        let err = walker.buffered_body().unwrap_err();
        assert!(matches!(
            err,
            BindError::PayloadTooLarge {
                limit: 8,
                actual: 32
            }
        ));
    }

    #[test]
    fn test_elapsed_deadline() {
        let mut request = RequestSnapshot::builder()
            .body("late")
            .deadline(Instant::now())
            .build();
        let options = DecodeOptions::default();
        let body = request.take_body();
        let mut walker = StructWalker::new(&request, body, &options);

        match walker.buffered_body().unwrap_err() {
            BindError::Io(err) => assert_eq!(err.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
