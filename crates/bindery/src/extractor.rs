//! Handler-facing extractors.
//!
//! [`FromRequest`] lets a handler framework build its arguments from a
//! [`RequestSnapshot`]. [`Bound<T>`] is the extractor backed by the binding
//! engine.

use std::ops::{Deref, DerefMut};

use crate::context::RequestSnapshot;
use crate::walker::Bind;
use crate::{BindError, Decoder};

/// Trait for types that can be extracted from a request snapshot.
///
/// Extraction takes the snapshot mutably because reading the body consumes
/// it; only one extractor per request should read the body.
///
/// # Implementing `FromRequest`
///
/// ```rust
/// use bindery::{BindError, FromRequest, RequestSnapshot};
///
/// struct RoutePath(String);
///
/// impl FromRequest for RoutePath {
///     fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError> {
///         Ok(RoutePath(request.path().to_string()))
///     }
/// }
///
/// let mut request = RequestSnapshot::builder()
///     .uri("/users/adam".parse().unwrap())
///     .build();
/// assert_eq!(RoutePath::from_request(&mut request).unwrap().0, "/users/adam");
/// ```
pub trait FromRequest: Sized {
    /// Extracts this type from the request.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if extraction fails.
    fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError>;
}

// None if extraction fails
impl<T: FromRequest> FromRequest for Option<T> {
    fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError> {
        Ok(T::from_request(request).ok())
    }
}

// Lets the handler inspect the error itself
impl<T: FromRequest> FromRequest for Result<T, BindError> {
    fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError> {
        Ok(T::from_request(request))
    }
}

/// Extractor that binds the whole request into a [`Bind`] record.
///
/// The record starts from `T::default()`, so fields no source supplies keep
/// their default values.
///
/// # Example
///
/// ```rust
/// use bindery::{Bind, Bound, FromRequest, RequestSnapshot};
///
/// #[derive(Debug, Default, Bind)]
/// struct Page {
///     #[bind(query = "limit")]
///     limit: Option<u32>,
/// }
///
/// let mut request = RequestSnapshot::builder()
///     .uri("/items?limit=20".parse().unwrap())
///     .build();
/// let Bound(page) = Bound::<Page>::from_request(&mut request).unwrap();
/// assert_eq!(page.limit, Some(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bound<T>(pub T);

impl<T> Bound<T> {
    /// Consumes the extractor and returns the bound record.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Bound<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Bound<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Bind + Default> FromRequest for Bound<T> {
    fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError> {
        Decoder::new().bind(request).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Method(String);

    impl FromRequest for Method {
        fn from_request(request: &mut RequestSnapshot) -> Result<Self, BindError> {
            Ok(Method(request.method().to_string()))
        }
    }

    #[derive(Debug)]
    struct AlwaysFails;

    impl FromRequest for AlwaysFails {
        fn from_request(_request: &mut RequestSnapshot) -> Result<Self, BindError> {
            Err(BindError::InvalidTarget {
                type_name: "AlwaysFails",
            })
        }
    }

    #[test]
    fn test_basic_extraction() {
        let mut request = RequestSnapshot::builder().method(http::Method::PUT).build();
        assert_eq!(Method::from_request(&mut request).unwrap().0, "PUT");
    }

    #[test]
    fn test_option_extraction() {
        let mut request = RequestSnapshot::builder().build();

        assert!(<Option<Method>>::from_request(&mut request)
            .unwrap()
            .is_some());
        assert!(<Option<AlwaysFails>>::from_request(&mut request)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_result_extraction() {
        let mut request = RequestSnapshot::builder().build();

        let inner = <Result<AlwaysFails, BindError>>::from_request(&mut request).unwrap();
        assert_eq!(inner.unwrap_err().error_code(), "INVALID_TARGET");
    }
}
