//! Value coercion from raw wire text into typed field values.
//!
//! Every supported destination type implements [`Scalar`], which tags it with
//! a [`ScalarKind`] and carries its strict parser. [`BindValue`] lifts scalars
//! to the three field shapes the walker assigns: a bare scalar, an optional
//! scalar, and a sequence of scalars.
//!
//! No parser here is lenient: there is no trimming, no locale handling and no
//! fallback. A value that does not match the grammar of its type is a
//! [`ResolveError`] carrying the raw text.

use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use num_complex::{Complex32, Complex64};
use thiserror::Error;

use crate::schema::FieldKind;

/// Semantic types a raw value can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// UTF-8 text, passed through unchanged.
    Text,
    /// `true`/`false` and their short forms.
    Bool,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// Platform word sized signed integer.
    Isize,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// Platform word sized unsigned integer.
    Usize,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Complex number with 32-bit parts.
    Complex64,
    /// Complex number with 64-bit parts.
    Complex128,
    /// RFC 3339 timestamp.
    Timestamp,
    /// Compound unit-suffixed duration such as `1h30m`.
    Duration,
}

impl ScalarKind {
    /// Returns the bit width for integer kinds.
    #[must_use]
    pub fn integer_width(self) -> Option<u32> {
        match self {
            Self::I8 | Self::U8 => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 => Some(32),
            Self::I64 | Self::U64 => Some(64),
            Self::Isize | Self::Usize => Some(usize::BITS),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Bool => write!(f, "boolean"),
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Isize => {
                write!(f, "{}-bit signed integer", self.integer_width().unwrap_or(64))
            }
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::Usize => {
                write!(f, "{}-bit unsigned integer", self.integer_width().unwrap_or(64))
            }
            Self::F32 => write!(f, "32-bit float"),
            Self::F64 => write!(f, "64-bit float"),
            Self::Complex64 => write!(f, "64-bit complex number"),
            Self::Complex128 => write!(f, "128-bit complex number"),
            Self::Timestamp => write!(f, "RFC 3339 timestamp"),
            Self::Duration => write!(f, "duration"),
        }
    }
}

/// A raw value that failed strict parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {raw:?} as {kind}: {reason}")]
pub struct ResolveError {
    kind: ScalarKind,
    raw: String,
    reason: String,
}

impl ResolveError {
    /// Creates a resolve error for `raw` against `kind`.
    #[must_use]
    pub fn new(kind: ScalarKind, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Returns the destination kind.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Returns the offending raw text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the parser's explanation.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A type that a single raw string can be coerced into.
pub trait Scalar: Sized {
    /// The semantic kind this type resolves as.
    const KIND: ScalarKind;

    /// Parses `raw` strictly.
    fn parse_raw(raw: &str) -> Result<Self, ResolveError>;
}

/// A field type the walker can assign from path, query or header values.
///
/// Implemented for every [`Scalar`], for `Option<T>` and for `Vec<T>` where
/// `T: Scalar`. A `#[derive(Bind)]` field annotated with `path`, `query` or
/// `header` whose type does not implement this trait is rejected at compile
/// time.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be bound from path, query or header values",
    note = "supported types are text, booleans, integers, floats, complex numbers, timestamps \
            and durations, plus `Option` and `Vec` of those"
)]
pub trait BindValue: Sized {
    /// Shape of the field, reported in the binding schema.
    const SHAPE: FieldKind;

    /// Builds a value from the raw occurrences selected by the walker.
    ///
    /// Scalar and optional shapes read the first entry; sequences read all
    /// of them.
    fn resolve(raw: &[&str]) -> Result<Self, ResolveError>;
}

/// Resolves one raw string into a scalar.
pub fn resolve_scalar<T: Scalar>(raw: &str) -> Result<T, ResolveError> {
    T::parse_raw(raw)
}

/// Resolves a raw string into an owned optional value.
///
/// Only call this when the source key is present; an absent key must leave
/// the field as `None` rather than `Some` of a zero value.
pub fn resolve_optional<T: Scalar>(raw: &str) -> Result<Option<T>, ResolveError> {
    T::parse_raw(raw).map(Some)
}

/// Resolves each raw string in order into a new sequence.
///
/// The first failing element aborts the whole sequence.
pub fn resolve_sequence<T, S>(raw: &[S]) -> Result<Vec<T>, ResolveError>
where
    T: Scalar,
    S: AsRef<str>,
{
    raw.iter().map(|r| T::parse_raw(r.as_ref())).collect()
}

/// Multi-value encoding of a sequence carried by a single-valued source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One occurrence per element (`?id=adam&id=eve`).
    Exploded,
    /// A single comma-delimited occurrence (`?id=adam,eve`).
    Joined,
}

impl Encoding {
    /// Selects the encoding from a binding's explode flag.
    #[must_use]
    pub fn from_explode(explode: bool) -> Self {
        if explode {
            Self::Exploded
        } else {
            Self::Joined
        }
    }

    /// Turns the occurrences a source delivered into per-element raw values.
    ///
    /// Exploded uses the occurrences verbatim. Joined splits the first
    /// occurrence on `,`.
    #[must_use]
    pub fn split<'a>(self, occurrences: &[&'a str]) -> Vec<&'a str> {
        match self {
            Self::Exploded => occurrences.to_vec(),
            Self::Joined => occurrences
                .first()
                .map(|raw| raw.split(',').collect())
                .unwrap_or_default(),
        }
    }
}

fn first<'a>(raw: &[&'a str], kind: ScalarKind) -> Result<&'a str, ResolveError> {
    raw.first()
        .copied()
        .ok_or_else(|| ResolveError::new(kind, "", "no value supplied"))
}

impl<T: Scalar> BindValue for Option<T> {
    const SHAPE: FieldKind = FieldKind::Optional(T::KIND);

    fn resolve(raw: &[&str]) -> Result<Self, ResolveError> {
        resolve_optional(first(raw, T::KIND)?)
    }
}

impl<T: Scalar> BindValue for Vec<T> {
    const SHAPE: FieldKind = FieldKind::Sequence(T::KIND);

    fn resolve(raw: &[&str]) -> Result<Self, ResolveError> {
        resolve_sequence(raw)
    }
}

macro_rules! impl_bind_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BindValue for $ty {
                const SHAPE: FieldKind = FieldKind::Scalar(<$ty as Scalar>::KIND);

                fn resolve(raw: &[&str]) -> Result<Self, ResolveError> {
                    resolve_scalar(first(raw, <$ty as Scalar>::KIND)?)
                }
            }
        )*
    };
}

impl_bind_value!(
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
    TimeDelta,
    StdDuration,
);

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::Text;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        Ok(raw.to_owned())
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(ResolveError::new(Self::KIND, raw, "invalid syntax")),
        }
    }
}

macro_rules! impl_integer_scalar {
    (signed: $($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
                    raw.parse::<$ty>().map_err(|e| integer_error(Self::KIND, raw, &e))
                }
            }
        )*
    };
    (unsigned: $($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                // `from_str` tolerates a leading `+` on unsigned types.
                fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
                    if raw.starts_with('+') {
                        return Err(ResolveError::new(Self::KIND, raw, "invalid syntax"));
                    }
                    raw.parse::<$ty>().map_err(|e| integer_error(Self::KIND, raw, &e))
                }
            }
        )*
    };
}

impl_integer_scalar!(
    signed:
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
);

impl_integer_scalar!(
    unsigned:
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

fn integer_error(kind: ScalarKind, raw: &str, err: &std::num::ParseIntError) -> ResolveError {
    use std::num::IntErrorKind;

    let reason = match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            format!("value out of range for {kind}")
        }
        IntErrorKind::Empty => "empty value".to_string(),
        _ => "invalid syntax".to_string(),
    };
    ResolveError::new(kind, raw, reason)
}

fn is_infinity_literal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

macro_rules! impl_float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
                    let value = raw
                        .parse::<$ty>()
                        .map_err(|_| ResolveError::new(Self::KIND, raw, "invalid syntax"))?;
                    if value.is_infinite() && !is_infinity_literal(raw) {
                        return Err(ResolveError::new(
                            Self::KIND,
                            raw,
                            format!("value out of range for {}", Self::KIND),
                        ));
                    }
                    Ok(value)
                }
            }
        )*
    };
}

impl_float_scalar!(f32 => F32, f64 => F64);

/// Splits complex text into its real and imaginary parts.
///
/// Accepts `a`, `bi`, `a+bi` and `a-bi`, optionally wrapped in parentheses.
/// A bare `i` stands for an imaginary part of one.
fn split_complex(raw: &str) -> Option<(&str, Option<&str>)> {
    let text = match (raw.strip_prefix('('), raw.ends_with(')')) {
        (Some(inner), true) => inner.strip_suffix(')')?,
        (None, false) => raw,
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let Some(body) = text.strip_suffix('i') else {
        return Some((text, None));
    };

    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));
    match split {
        Some(i) => Some((&body[..i], Some(&body[i..]))),
        None => Some(("0", Some(body))),
    }
}

macro_rules! impl_complex_scalar {
    ($($ty:ty => $part:ty, $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
                    let invalid = || ResolveError::new(Self::KIND, raw, "invalid syntax");
                    let (re, im) = split_complex(raw).ok_or_else(invalid)?;
                    let part = |text: &str| {
                        <$part as Scalar>::parse_raw(text).map_err(|e| {
                            ResolveError::new(Self::KIND, raw, e.reason().to_string())
                        })
                    };
                    let re = part(re)?;
                    let im = match im {
                        None => 0.0,
                        Some("" | "+") => 1.0,
                        Some("-") => -1.0,
                        Some(text) => part(text)?,
                    };
                    Ok(<$ty>::new(re, im))
                }
            }
        )*
    };
}

impl_complex_scalar!(Complex32 => f32, Complex64, Complex64 => f64, Complex128);

impl Scalar for DateTime<FixedOffset> {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        DateTime::parse_from_rfc3339(raw)
            .map_err(|e| ResolveError::new(Self::KIND, raw, e.to_string()))
    }
}

impl Scalar for DateTime<Utc> {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        DateTime::<FixedOffset>::parse_raw(raw).map(|ts| ts.with_timezone(&Utc))
    }
}

impl Scalar for TimeDelta {
    const KIND: ScalarKind = ScalarKind::Duration;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        parse_duration(raw)
    }
}

impl Scalar for StdDuration {
    const KIND: ScalarKind = ScalarKind::Duration;

    fn parse_raw(raw: &str) -> Result<Self, ResolveError> {
        parse_duration(raw)?
            .to_std()
            .map_err(|_| ResolveError::new(Self::KIND, raw, "negative duration"))
    }
}

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Fraction digits beyond this many cannot change a nanosecond total.
const MAX_FRACTION_DIGITS: usize = 20;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Parses a duration such as `300ms`, `-1.5h` or `2h45m`.
///
/// The grammar is an optional sign followed by one or more decimal numbers,
/// each with an optional fraction and a mandatory unit suffix (`ns`, `us`,
/// `µs`, `ms`, `s`, `m`, `h`). A bare `0` is also accepted. The total must fit
/// in a signed 64-bit count of nanoseconds.
pub fn parse_duration(raw: &str) -> Result<TimeDelta, ResolveError> {
    let kind = ScalarKind::Duration;
    let fail = |reason: &str| ResolveError::new(kind, raw, reason);

    let (negative, mut rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(fail("invalid duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, tail) = rest.split_at(int_end);
        rest = tail;

        let mut frac_part = "";
        if let Some(tail) = rest.strip_prefix('.') {
            let frac_end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
            frac_part = &tail[..frac_end];
            rest = &tail[frac_end..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(fail("invalid duration"));
        }

        let unit_end = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (unit, tail) = rest.split_at(unit_end);
        rest = tail;
        if unit.is_empty() {
            return Err(fail("missing unit in duration"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| fail("unknown unit in duration"))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| fail("invalid duration"))?
        };

        let mut frac: u128 = 0;
        let mut divisor: u128 = 1;
        for digit in frac_part.bytes().take(MAX_FRACTION_DIGITS) {
            frac = frac * 10 + u128::from(digit - b'0');
            divisor *= 10;
        }

        let value = whole
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac * scale / divisor))
            .ok_or_else(|| fail("duration out of range"))?;
        total = total
            .checked_add(value)
            .ok_or_else(|| fail("duration out of range"))?;
    }

    let limit = if negative {
        i64::MAX.unsigned_abs() as u128 + 1
    } else {
        i64::MAX.unsigned_abs() as u128
    };
    if total > limit {
        return Err(fail("duration out of range"));
    }
    let signed = if negative {
        -(total as i128)
    } else {
        total as i128
    };
    let nanos = i64::try_from(signed).map_err(|_| fail("duration out of range"))?;
    Ok(TimeDelta::nanoseconds(nanos))
}

fn push_fraction(out: &mut String, value: u128, digits: usize) {
    if value == 0 {
        return;
    }
    let padded = format!("{value:0digits$}");
    out.push('.');
    out.push_str(padded.trim_end_matches('0'));
}

/// Formats a duration in the canonical form accepted by [`parse_duration`].
///
/// Durations under one second use the largest fitting sub-second unit
/// (`300ms`, `1.5µs`, `42ns`); longer ones are written as hours, minutes
/// and fractional seconds with leading zero units omitted (`1h30m0s`,
/// `2m0.5s`, `1.5s`). Zero is `0s`.
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    let nanos = i128::from(duration.num_seconds()) * NANOS_PER_SEC as i128
        + i128::from(duration.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let u = nanos.unsigned_abs();

    if u < NANOS_PER_MICRO {
        out.push_str(&format!("{u}ns"));
    } else if u < NANOS_PER_MILLI {
        out.push_str(&(u / NANOS_PER_MICRO).to_string());
        push_fraction(&mut out, u % NANOS_PER_MICRO, 3);
        out.push_str("\u{b5}s");
    } else if u < NANOS_PER_SEC {
        out.push_str(&(u / NANOS_PER_MILLI).to_string());
        push_fraction(&mut out, u % NANOS_PER_MILLI, 6);
        out.push_str("ms");
    } else {
        let secs = u / NANOS_PER_SEC;
        let hours = secs / 3600;
        let minutes = (secs / 60) % 60;
        if hours > 0 {
            out.push_str(&format!("{hours}h{minutes}m"));
        } else if minutes > 0 {
            out.push_str(&format!("{minutes}m"));
        }
        out.push_str(&(secs % 60).to_string());
        push_fraction(&mut out, u % NANOS_PER_SEC, 9);
        out.push('s');
    }
    out
}
