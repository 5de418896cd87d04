//! # Bindery
//!
//! Declarative binding of HTTP request data into typed records.
//!
//! A record declares, per field, where its value comes from. The engine pulls
//! those values out of a [`RequestSnapshot`], coerces the raw text into each
//! field's type, and merges the structured body on top.
//!
//! ## Sources
//!
//! | Attribute | Source | Notes |
//! |-----------|--------|-------|
//! | `path = "key"` | Router path variables | A sequence splits the value on `,` |
//! | `query = "key"` | Query string | Add `explode` to read repeated keys as a sequence |
//! | `header = "Key"` | Headers | Case-insensitive; a sequence takes every occurrence |
//! | `body = "application/json"` | Request body | The field receives the whole payload |
//! | `nested` | Nested [`Bind`] record | Walked recursively |
//! | `json = "key"` / `json_skip` | Body merge | Rename or exclude the field's body key |
//!
//! A field whose type is itself a record is only walked when it carries
//! `nested`. Without it the record is opaque to the walker: only the body
//! merge reaches it, and the annotations on its own fields are ignored.
//!
//! When several sources supply one field, the later one in the order path,
//! query, header wins. If no field is a body sink, the body is merged into
//! the whole record and any key it carries overrides all three.
//!
//! ## Example
//!
//! ```rust
//! use bindery::{decode, Bind, RequestSnapshot};
//! use chrono::TimeDelta;
//!
//! #[derive(Debug, Clone, Default, Bind)]
//! struct Request {
//!     state: String,
//! }
//!
//! #[derive(Debug, Clone, Default, Bind)]
//! struct Move {
//!     #[bind(body = "application/json", nested)]
//!     request: Request,
//!     #[bind(query = "active")]
//!     active: bool,
//!     #[bind(header = "X-DELAY")]
//!     delay: TimeDelta,
//!     #[bind(query = "id", explode)]
//!     ids: Vec<String>,
//! }
//!
//! let mut request = RequestSnapshot::builder()
//!     .uri("/move?active=true&id=adam&id=eve".parse().unwrap())
//!     .header("x-delay", "1m30s")
//!     .body(r#"{"state":"ready"}"#)
//!     .build();
//!
//! let mut target = Move::default();
//! decode(&mut request, &mut target).unwrap();
//!
//! assert_eq!(target.request.state, "ready");
//! assert!(target.active);
//! assert_eq!(target.delay, TimeDelta::seconds(90));
//! assert_eq!(target.ids, vec!["adam", "eve"]);
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`BindError`]. Decoding stops at the first error and the
//! target is left as it was before the call.
//!
//! ```rust
//! use bindery::{decode, Bind, BindError, RequestSnapshot};
//!
//! #[derive(Debug, Clone, Default, Bind)]
//! struct Page {
//!     #[bind(query = "limit")]
//!     limit: u8,
//! }
//!
//! let mut request = RequestSnapshot::builder()
//!     .uri("/items?limit=300".parse().unwrap())
//!     .build();
//!
//! let err = decode(&mut request, &mut Page::default()).unwrap_err();
//! assert!(matches!(err, BindError::MalformedValue { .. }));
//! assert_eq!(err.raw_value(), Some("300"));
//! ```

#![doc(html_root_url = "https://docs.rs/bindery/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Lets `#[derive(Bind)]` expand to `::bindery::...` inside this crate too.
extern crate self as bindery;

pub mod body;
mod context;
mod decoder;
mod error;
mod extractor;
mod path;
mod query;
pub mod resolve;
mod schema;
mod walker;

pub use body::{decode_body, Json, MergeBody};
pub use context::{Body, RequestSnapshot, RequestSnapshotBuilder};
pub use decoder::{decode, DecodeOptions, Decoder, DEFAULT_MAX_BODY_SIZE};
pub use error::BindError;
pub use extractor::{Bound, FromRequest};
pub use path::PathVars;
pub use query::QueryValues;
pub use resolve::{
    format_duration, parse_duration, resolve_optional, resolve_scalar, resolve_sequence,
    BindValue, Encoding, ResolveError, Scalar, ScalarKind,
};
pub use schema::{BindingSchema, FieldBinding, FieldKind, SourceBinding, SourceKind, TargetKind};
pub use walker::{Bind, StructWalker};

// A trait and a derive macro may share a name.
pub use bindery_macros::Bind;
