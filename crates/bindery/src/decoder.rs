//! Decode entry points.

use crate::body::{decode_body, is_json};
use crate::context::RequestSnapshot;
use crate::walker::{Bind, StructWalker};
use crate::BindError;

/// Default maximum body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Options shared by every decode call of a [`Decoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum number of body bytes buffered before giving up.
    pub max_body_size: usize,
    /// Media types decoded as JSON in addition to `application/json`.
    pub json_media_types: Vec<String>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            json_media_types: Vec::new(),
        }
    }
}

impl DecodeOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Add a media type to decode as JSON, such as `application/problem+json`.
    #[must_use]
    pub fn json_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.json_media_types.push(media_type.into());
        self
    }
}

/// Binds requests into [`Bind`] records.
///
/// A decoder holds no per-request state and can be shared between threads.
///
/// # Example
///
/// ```rust
/// use bindery::{Bind, Decoder, DecodeOptions, RequestSnapshot};
///
/// #[derive(Debug, Clone, Default, Bind)]
/// struct Move {
///     #[bind(path = "name")]
///     name: String,
///     #[bind(query = "game")]
///     game: String,
///     state: String,
/// }
///
/// let decoder = Decoder::with_options(DecodeOptions::new().max_body_size(4096));
/// let mut request = RequestSnapshot::builder()
///     .uri("/players/adam?game=chess".parse().unwrap())
///     .path_var("name", "adam")
///     .header("content-type", "application/json")
///     .body(r#"{"state":"waiting"}"#)
///     .build();
///
/// let mut target = Move::default();
/// decoder.decode(&mut request, &mut target).unwrap();
///
/// assert_eq!(target.name, "adam");
/// assert_eq!(target.game, "chess");
/// assert_eq!(target.state, "waiting");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// Creates a decoder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with the given options.
    #[must_use]
    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Returns the decoder options.
    #[must_use]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Binds `request` into `target`.
    ///
    /// Fields are walked in declaration order and assigned from path, query
    /// and header values in that priority. A body sink anywhere in the record
    /// receives the body; if there is none, the body is merged into the whole
    /// target according to the request's `Content-Type`.
    ///
    /// The walk runs on a copy of `target` that replaces it only once every
    /// field has bound, so a failed decode leaves `target` as it was. The
    /// request body is taken out of `request` whether or not it is read.
    ///
    /// # Errors
    ///
    /// Any [`BindError`].
    pub fn decode<T: Bind + Clone>(
        &self,
        request: &mut RequestSnapshot,
        target: &mut T,
    ) -> Result<(), BindError> {
        let mut staged = target.clone();
        self.walk(request, &mut staged)?;
        *target = staged;
        Ok(())
    }

    /// Builds a fresh `T` from `request`, starting from `T::default()`.
    ///
    /// # Errors
    ///
    /// Any [`BindError`].
    pub fn bind<T: Bind + Default>(&self, request: &mut RequestSnapshot) -> Result<T, BindError> {
        let mut target = T::default();
        self.walk(request, &mut target)?;
        Ok(target)
    }

    fn walk<T: Bind>(
        &self,
        request: &mut RequestSnapshot,
        target: &mut T,
    ) -> Result<(), BindError> {
        if !T::SCHEMA.is_record() {
            return Err(BindError::InvalidTarget {
                type_name: T::SCHEMA.type_name(),
            });
        }

        let body = request.take_body();
        let request: &RequestSnapshot = request;
        let mut walker = StructWalker::new(request, body, &self.options);
        let consumed = walker.visit_record(target)?;

        if !consumed {
            let content_type = request.content_type();
            if content_type.is_some_and(|ct| is_json(ct, &self.options.json_media_types)) {
                let bytes = walker.buffered_body()?;
                let merged = decode_body(
                    &bytes,
                    content_type,
                    &self.options.json_media_types,
                    target,
                )?;
                tracing::debug!(
                    target_type = T::SCHEMA.type_name(),
                    merged,
                    len = bytes.len(),
                    "whole-body fallback decode"
                );
            } else {
                let len = walker.discard_body()?;
                tracing::debug!(
                    content_type = content_type.unwrap_or("none"),
                    len,
                    "discarding request body with unsupported content type"
                );
            }
        }

        tracing::debug!(
            target_type = T::SCHEMA.type_name(),
            method = %request.method(),
            path = request.path(),
            body_sink = consumed,
            "request bound"
        );
        Ok(())
    }
}

/// Binds `request` into `target` with default options.
///
/// # Errors
///
/// See [`Decoder::decode`].
pub fn decode<T: Bind + Clone>(
    request: &mut RequestSnapshot,
    target: &mut T,
) -> Result<(), BindError> {
    Decoder::new().decode(request, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{JsonError, JsonValue, MergeBody};
    use crate::schema::BindingSchema;

    #[derive(Debug, Clone, Default)]
    struct Counter(u32);

    impl MergeBody for Counter {
        fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
            self.0.merge_json(value)
        }
    }

    impl Bind for Counter {
        const SCHEMA: BindingSchema = BindingSchema::opaque("Counter");

        fn bind_fields(&mut self, _walker: &mut StructWalker<'_>) -> Result<(), BindError> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn test_options_builder() {
        let options = DecodeOptions::new()
            .max_body_size(512)
            .json_media_type("application/vnd.api+json");

        assert_eq!(options.max_body_size, 512);
        assert_eq!(options.json_media_types, vec!["application/vnd.api+json"]);
        assert_eq!(DecodeOptions::default().max_body_size, DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_opaque_target_is_rejected_untouched() {
        let mut request = RequestSnapshot::builder()
            .header("content-type", "application/json")
            .body("7")
            .build();
        let mut counter = Counter(0);

        let err = decode(&mut request, &mut counter).unwrap_err();
        assert!(matches!(err, BindError::InvalidTarget { type_name: "Counter" }));
        assert_eq!(counter.0, 0);

        let err = Decoder::new().bind::<Counter>(&mut request).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TARGET");
    }
}
