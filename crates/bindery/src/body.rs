//! Structured body decoding.
//!
//! The body decoder parses a buffered payload and merges it into a target
//! structurally: object keys present in the payload overwrite the matching
//! fields, keys absent from the payload leave fields as they were. This is
//! what lets body values sit on top of path, query and header values without
//! erasing them.
//!
//! Only JSON is understood. A payload declared with any other content type
//! is discarded without error, so a mislabelled body silently binds nothing.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use num_complex::{Complex32, Complex64};
use serde::de::{DeserializeOwned, Error as _, Unexpected};

use crate::resolve::parse_duration;
use crate::BindError;

/// JSON value type the merge operates on.
pub type JsonValue = serde_json::Value;

/// JSON object type the merge operates on.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Error produced by a failed merge.
pub type JsonError = serde_json::Error;

/// The one structured media type the decoder understands.
pub const APPLICATION_JSON: &str = "application/json";

/// A destination the body decoder can merge a JSON value into.
///
/// `#[derive(Bind)]` implements this for records: each payload key present
/// is merged into the field carrying that body key, and everything else is
/// left untouched. Leaf types replace their value; `null` leaves a
/// non-optional leaf unchanged.
pub trait MergeBody {
    /// Merges `value` into `self`.
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError>;
}

fn unexpected(value: &JsonValue) -> Unexpected<'_> {
    match value {
        JsonValue::Null => Unexpected::Unit,
        JsonValue::Bool(b) => Unexpected::Bool(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Unexpected::Signed)
            .or_else(|| n.as_u64().map(Unexpected::Unsigned))
            .or_else(|| n.as_f64().map(Unexpected::Float))
            .unwrap_or(Unexpected::Other("number")),
        JsonValue::String(s) => Unexpected::Str(s),
        JsonValue::Array(_) => Unexpected::Seq,
        JsonValue::Object(_) => Unexpected::Map,
    }
}

/// Unpacks the payload for a record merge.
///
/// Returns `None` for `null`, which leaves the record untouched. Anything
/// other than an object is a type error naming `expected`.
pub fn object_or_null(value: JsonValue, expected: &str) -> Result<Option<JsonObject>, JsonError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Object(object) => Ok(Some(object)),
        other => Err(JsonError::invalid_type(
            unexpected(&other),
            &format!("an object for {expected}").as_str(),
        )),
    }
}

macro_rules! impl_merge_by_replace {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MergeBody for $ty {
                fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
                    if !value.is_null() {
                        *self = serde_json::from_value(value)?;
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_merge_by_replace!(
    String,
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Complex32,
    Complex64,
    DateTime<FixedOffset>,
    DateTime<Utc>,
);

fn duration_from_json(value: &JsonValue) -> Result<TimeDelta, JsonError> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .map(TimeDelta::nanoseconds)
            .ok_or_else(|| JsonError::invalid_value(unexpected(value), &"integer nanoseconds")),
        JsonValue::String(text) => {
            parse_duration(text).map_err(|e| JsonError::custom(e.to_string()))
        }
        other => Err(JsonError::invalid_type(
            unexpected(other),
            &"a duration string or integer nanoseconds",
        )),
    }
}

impl MergeBody for TimeDelta {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        if !value.is_null() {
            *self = duration_from_json(&value)?;
        }
        Ok(())
    }
}

impl MergeBody for StdDuration {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        if !value.is_null() {
            *self = duration_from_json(&value)?
                .to_std()
                .map_err(|_| JsonError::custom("negative duration"))?;
        }
        Ok(())
    }
}

impl MergeBody for JsonValue {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        *self = value;
        Ok(())
    }
}

impl<T: MergeBody + ?Sized> MergeBody for Box<T> {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        (**self).merge_json(value)
    }
}

impl<T: MergeBody + Default> MergeBody for Option<T> {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).merge_json(value)
    }
}

impl<T: MergeBody + Default> MergeBody for Vec<T> {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        match value {
            JsonValue::Null => {
                self.clear();
                Ok(())
            }
            JsonValue::Array(items) => {
                let mut fresh = Vec::with_capacity(items.len());
                for item in items {
                    let mut element = T::default();
                    element.merge_json(item)?;
                    fresh.push(element);
                }
                *self = fresh;
                Ok(())
            }
            other => Err(JsonError::invalid_type(unexpected(&other), &"an array")),
        }
    }
}

macro_rules! impl_merge_map {
    ($($map:ident),*) => {
        $(
            impl<T: MergeBody + Default> MergeBody for $map<String, T> {
                fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
                    match value {
                        JsonValue::Null => {
                            self.clear();
                            Ok(())
                        }
                        JsonValue::Object(object) => {
                            for (key, item) in object {
                                let mut element = T::default();
                                element.merge_json(item)?;
                                self.insert(key, element);
                            }
                            Ok(())
                        }
                        other => Err(JsonError::invalid_type(unexpected(&other), &"an object")),
                    }
                }
            }
        )*
    };
}

impl_merge_map!(HashMap, BTreeMap);

/// Whole-value JSON field.
///
/// Wraps any `serde` type that should be replaced as a unit by the body
/// decoder rather than merged key by key. A `null` leaves it unchanged, like
/// every other leaf.
///
/// # Example
///
/// ```rust
/// use bindery::{Json, MergeBody};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let mut point = Json(Point::default());
/// point.merge_json(serde_json::json!({"x": 1, "y": 2})).unwrap();
/// assert_eq!(*point, Point { x: 1, y: 2 });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consumes the Json and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: DeserializeOwned> MergeBody for Json<T> {
    fn merge_json(&mut self, value: JsonValue) -> Result<(), JsonError> {
        if value.is_null() {
            return Ok(());
        }
        self.0 = serde_json::from_value(value)?;
        Ok(())
    }
}

/// Returns true if `content_type` names JSON or one of `extra` media types.
///
/// Parameters such as `charset` are ignored; an unparsable content type is
/// not JSON.
#[must_use]
pub fn is_json(content_type: &str, extra: &[String]) -> bool {
    let Ok(mime) = content_type.trim().parse::<mime::Mime>() else {
        return false;
    };
    let essence = mime.essence_str();
    essence.eq_ignore_ascii_case(APPLICATION_JSON)
        || extra.iter().any(|m| essence.eq_ignore_ascii_case(m))
}

/// Decodes a buffered payload into `target` according to `content_type`.
///
/// Returns `Ok(true)` if the payload was parsed and merged, `Ok(false)` if
/// the content type is not JSON and the payload was discarded. An empty
/// payload declared as JSON is a parse error.
pub fn decode_body<T: MergeBody + ?Sized>(
    bytes: &[u8],
    content_type: Option<&str>,
    extra_json_types: &[String],
    target: &mut T,
) -> Result<bool, BindError> {
    match content_type {
        Some(ct) if is_json(ct, extra_json_types) => {
            let value: JsonValue = serde_json::from_slice(bytes).map_err(BindError::MalformedBody)?;
            target.merge_json(value).map_err(BindError::MalformedBody)?;
            Ok(true)
        }
        other => {
            tracing::debug!(
                content_type = other.unwrap_or("none"),
                len = bytes.len(),
                "discarding request body with unsupported content type"
            );
            Ok(false)
        }
    }
}
