//! Derive macro for Bindery records.
//!
//! `#[derive(Bind)]` turns the `#[bind(...)]` annotations on a struct's fields
//! into a `const` binding schema and the typed code that walks those fields
//! and merges a JSON body into them. Annotations are checked at compile time:
//! an unknown attribute, an empty key or a source on a field whose type has
//! no coercion rule is a compile error.
//!
//! The macro is re-exported by the `bindery` crate; depend on that crate
//! rather than on this one.

mod expand;
mod parse;

use proc_macro::TokenStream;

/// Derives `bindery::Bind` and `bindery::MergeBody` for a struct with named
/// fields.
///
/// # Field attributes
///
/// - `path = "key"`, `query = "key"`, `header = "Key"`: request sources. A
///   field may carry several; the walker applies them in the order path,
///   query, header.
/// - `explode`: query sequences read repeated keys instead of splitting one
///   value on `,`.
/// - `body = "application/json"`: the field receives the request body.
/// - `nested`: the field is itself a `Bind` record and is walked recursively.
/// - `json = "key"`: key used when merging a JSON body (defaults to the field
///   name).
/// - `json_skip`: the body merge never touches the field.
///
/// Every field not marked `json_skip` must implement `MergeBody`.
///
/// # Nested records
///
/// The macro cannot tell from a field's type whether it is a `Bind` record.
/// A record-typed field **must** be marked `nested` for the walker to enter
/// it. Without `nested` the field is opaque: the body merge still reaches it
/// by key, but the `path`, `query` and `header` annotations inside it and
/// any `body` sinks it declares are never applied. This holds for a field
/// that is itself a body sink too, so write `#[bind(body = "...", nested)]`
/// when the sink's type carries sources of its own.
///
/// # Example
///
/// ```rust,ignore
/// use bindery::Bind;
///
/// #[derive(Debug, Default, Bind)]
/// struct Move {
///     #[bind(path = "name")]
///     name: String,
///     #[bind(query = "game")]
///     game: String,
///     state: String,
///     #[bind(header = "X-DELAY")]
///     delay: chrono::TimeDelta,
/// }
/// ```
///
/// # Generated Code
///
/// The macro generates approximately:
///
/// ```rust,ignore
/// impl bindery::Bind for Move {
///     const SCHEMA: BindingSchema = BindingSchema::record("Move", &[/* one FieldBinding per field */]);
///
///     fn bind_fields(&mut self, walker: &mut StructWalker<'_>) -> Result<(), BindError> {
///         let fields = Self::SCHEMA.fields();
///         walker.bind_value(&fields[0], &mut self.name)?;
///         walker.bind_value(&fields[1], &mut self.game)?;
///         walker.bind_value(&fields[3], &mut self.delay)?;
///         Ok(())
///     }
/// }
///
/// impl bindery::MergeBody for Move {
///     fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
///         // each key present in the object is merged into its field
///     }
/// }
/// ```
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(item: TokenStream) -> TokenStream {
    expand::expand_bind(item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
