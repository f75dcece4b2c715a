//! Typed, wrappable errors
//!
//! This module lets callers declare their own concrete error types that still
//! behave like a standard error chain. A variant embeds [`WrappableError`],
//! which stores the underlying cause, relays its message and exposes it through
//! [`Error::source`]. Callers can then match on the concrete variant type with
//! [`check_as`] or [`find_as`] while still being able to walk down to the root
//! cause.
//!
//! ```
//! use std::error::Error;
//! use std::io;
//!
//! use image_builder::errors::{check_as, find_as};
//! use image_builder::{errorf, wrappable_error};
//!
//! wrappable_error! {
//!     pub struct ErrLookup;
//! }
//!
//! let io_err = io::Error::new(io::ErrorKind::TimedOut, "timed out");
//! let err = errorf!(ErrLookup::default(), source = io_err, "lookup failed: {source}");
//! assert_eq!(err.to_string(), "lookup failed: timed out");
//!
//! let got: &(dyn Error + 'static) = &err;
//! assert!(check_as(Some(got), &ErrLookup::default()));
//! assert_eq!(find_as::<io::Error>(got).unwrap().kind(), io::ErrorKind::TimedOut);
//! ```

use std::error::Error;
use std::fmt;

/// Boxed error stored as the cause of a wrapped error.
pub type Cause = Box<dyn Error + Send + Sync + 'static>;

/// A wrappable error.
///
/// Implementors embed a [`WrappableError`] and hand out access to it; the
/// provided methods do the rest. Use [`wrappable_error!`](crate::wrappable_error)
/// to declare a variant without writing the impls by hand.
pub trait Wrappable: Error + Send + Sync + 'static {
    /// The embedded base.
    fn wrappable(&self) -> &WrappableError;

    /// Mutable access to the embedded base, used while constructing.
    fn wrappable_mut(&mut self) -> &mut WrappableError;

    /// Stores `err` as the cause. Only the first call has any effect.
    fn set_wrapped(&mut self, err: Cause) {
        self.wrappable_mut().set_wrapped(err);
    }

    /// The stored cause, if any.
    fn wrapped(&self) -> Option<&(dyn Error + 'static)> {
        self.wrappable().wrapped()
    }
}

/// Base struct embedded by wrappable error types.
///
/// Displays as its cause's message, or as the empty string when no cause has
/// been stored.
#[derive(Debug, Default)]
pub struct WrappableError {
    err: Option<Cause>,
}

impl WrappableError {
    /// Creates a base with its cause fixed up front.
    pub fn new(err: impl Into<Cause>) -> Self {
        Self {
            err: Some(err.into()),
        }
    }

    /// The stored cause, if any.
    pub fn wrapped(&self) -> Option<&(dyn Error + 'static)> {
        self.err
            .as_deref()
            .map(|err| err as &(dyn Error + 'static))
    }

    /// Stores `err` unless a cause is already present.
    pub fn set_wrapped(&mut self, err: Cause) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }
}

impl fmt::Display for WrappableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wrapped() {
            Some(err) => fmt::Display::fmt(err, f),
            None => Ok(()),
        }
    }
}

impl Error for WrappableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.wrapped()
    }
}

/// A formatted message, optionally wrapping the error it was built from.
///
/// This is the cause [`errorf`] and [`wrapf`] store into a variant.
#[derive(thiserror::Error, Debug)]
#[error("{msg}")]
pub struct FormattedError {
    msg: String,
    #[source]
    source: Option<Cause>,
}

impl FormattedError {
    /// A message with nothing underneath it.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            source: None,
        }
    }

    /// A message chaining to `source`.
    pub fn wrapping(msg: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self {
            msg: msg.into(),
            source: Some(source.into()),
        }
    }
}

/// Returns a plain error carrying `msg` and nothing else.
pub fn new(msg: impl Into<String>) -> Cause {
    Box::new(FormattedError::new(msg))
}

/// Stores `msg` as the cause of `err` and returns it.
///
/// The resulting chain ends at the message. Use [`wrapf`], or the
/// [`errorf!`](crate::errorf) macro with `source = ...`, to keep an
/// underlying error reachable.
pub fn errorf<W: Wrappable>(mut err: W, msg: impl Into<String>) -> W {
    err.set_wrapped(Box::new(FormattedError::new(msg)));
    err
}

/// Stores `msg` as the cause of `err`, with `source` chained underneath it.
///
/// # Arguments
///
/// * `err` - A fresh variant with no cause yet
/// * `msg` - The fully formatted message, usually including `source`'s text
/// * `source` - The error being wrapped
///
/// # Returns
///
/// The variant, displaying as `msg`, whose chain continues into `source`.
pub fn wrapf<W: Wrappable>(mut err: W, msg: impl Into<String>, source: impl Into<Cause>) -> W {
    err.set_wrapped(Box::new(FormattedError::wrapping(msg, source)));
    err
}

/// Iterates over `err` and every error it wraps, outermost first.
pub fn chain<'a>(err: &'a (dyn Error + 'static)) -> anyhow::Chain<'a> {
    anyhow::Chain::new(err)
}

/// The innermost error of the chain starting at `err`.
pub fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    chain(err).last().unwrap_or(err)
}

/// Finds the first error in the chain starting at `err` whose concrete type
/// is `T`.
pub fn find_as<'a, T: Error + 'static>(err: &'a (dyn Error + 'static)) -> Option<&'a T> {
    chain(err).find_map(|err| err.downcast_ref::<T>())
}

/// Reports whether any error in the chain starting at `got` has the same
/// concrete type as `want`.
///
/// Only the type of `want` matters, which makes this handy for table-driven
/// tests that store expected errors as values. Returns `false` when `got` is
/// `None`.
pub fn check_as<T: Error + 'static>(got: Option<&(dyn Error + 'static)>, _want: &T) -> bool {
    got.is_some_and(|err| find_as::<T>(err).is_some())
}

/// Declares one or more wrappable error types.
///
/// Each declared type is a newtype over [`WrappableError`] with `Debug`,
/// `Default`, `Display`, `Error` and [`Wrappable`] implemented.
///
/// ```
/// use image_builder::errors::Wrappable;
///
/// image_builder::wrappable_error! {
///     /// The image could not be built.
///     pub struct ErrBuild;
/// }
///
/// let err = ErrBuild::default();
/// assert_eq!(err.to_string(), "");
/// assert!(err.wrapped().is_none());
/// ```
#[macro_export]
macro_rules! wrappable_error {
    ($($(#[$meta:meta])* $vis:vis struct $name:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Default)]
            $vis struct $name($crate::errors::WrappableError);

            impl ::std::fmt::Display for $name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    ::std::fmt::Display::fmt(&self.0, f)
                }
            }

            impl ::std::error::Error for $name {
                fn source(&self) -> ::std::option::Option<&(dyn ::std::error::Error + 'static)> {
                    self.0.wrapped()
                }
            }

            impl $crate::errors::Wrappable for $name {
                fn wrappable(&self) -> &$crate::errors::WrappableError {
                    &self.0
                }

                fn wrappable_mut(&mut self) -> &mut $crate::errors::WrappableError {
                    &mut self.0
                }
            }
        )+
    };
}

/// Formats a message and stores it as the cause of a wrappable error.
///
/// With `source = err` the error is wrapped: the template must mention it as
/// `{source}`, and the chain of the returned variant continues into `err`.
/// Positional arguments and inline captures work as in [`format!`].
///
/// The variant and the message stored in it display the same text, so render
/// the result with `{}`. Alternate formatting that joins every link of the
/// chain, such as anyhow's `{:#}`, repeats the message once per layer.
///
/// ```
/// use image_builder::errors;
/// use image_builder::{errorf, wrappable_error};
///
/// wrappable_error! {
///     pub struct ErrPush;
///     pub struct ErrInvalidTags;
/// }
///
/// let tag = "app:v1";
/// let err = errorf!(ErrPush::default(), source = errors::new("denied"), "failed to push {}: {source}", tag);
/// assert_eq!(err.to_string(), "failed to push app:v1: denied");
///
/// let err = errorf!(ErrInvalidTags::default(), "at least one tag name must be specified");
/// assert_eq!(err.to_string(), "at least one tag name must be specified");
/// ```
#[macro_export]
macro_rules! errorf {
    ($err:expr, source = $source:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let source: $crate::errors::Cause = ::std::convert::Into::into($source);
        let msg = ::std::format!($fmt $(, $arg)*, source = source);
        $crate::errors::wrapf($err, msg, source)
    }};
    ($err:expr, $($arg:tt)+) => {
        $crate::errors::errorf($err, ::std::format!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    crate::wrappable_error! {
        struct ErrFoo;
        struct ErrBar;
        struct ErrDnsFailure;
    }

    #[derive(thiserror::Error, Debug)]
    #[error("no route to {host}")]
    struct NetworkError {
        host: String,
    }

    fn eof() -> io::Error {
        io::Error::new(io::ErrorKind::UnexpectedEof, "EOF")
    }

    #[test]
    fn test_unset_displays_empty() {
        let err = ErrFoo::default();
        assert_eq!(err.to_string(), "");
        assert!(err.wrapped().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_set_wrapped_relays_cause() {
        let mut err = ErrFoo::default();
        err.set_wrapped(Box::new(eof()));

        assert_eq!(err.to_string(), "EOF");
        let got: &(dyn Error + 'static) = &err;
        assert!(find_as::<io::Error>(got).is_some());
        assert!(!check_as(Some(got), &ErrBar::default()));
        assert!(check_as(Some(got), &ErrFoo::default()));
    }

    #[test]
    fn test_set_wrapped_is_write_once() {
        let mut err = ErrFoo::default();
        err.set_wrapped(new("first"));
        err.set_wrapped(new("second"));
        assert_eq!(err.to_string(), "first");
    }

    #[test]
    fn test_base_with_cause() {
        let base = WrappableError::new(eof());
        assert_eq!(base.to_string(), "EOF");
        assert!(base.source().is_some());
    }

    #[test]
    fn test_errorf_relays_source() {
        let err = errorf!(ErrFoo::default(), source = eof(), "{source}");
        assert_eq!(err.to_string(), "EOF");
    }

    #[test]
    fn test_errorf_prefix() {
        let err = errorf!(ErrFoo::default(), source = eof(), "custom: {source}");
        assert_eq!(err.to_string(), format!("custom: {}", eof()));

        let got: &(dyn Error + 'static) = &err;
        let io_err = find_as::<io::Error>(got).unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(find_as::<NetworkError>(got).is_none());
    }

    #[test]
    fn test_errorf_with_arguments() {
        let tag = "app:1";
        let err = errorf!(
            ErrFoo::default(),
            source = eof(),
            "failed to push {} ({tag}): {source}",
            "registry",
        );
        assert_eq!(err.to_string(), "failed to push registry (app:1): EOF");
    }

    #[test]
    fn test_errorf_without_source() {
        let err = errorf!(ErrFoo::default(), "foo {}", 42);
        assert_eq!(err.to_string(), "foo 42");

        let got: &(dyn Error + 'static) = &err;
        assert_eq!(chain(got).count(), 2);
        assert_eq!(root_cause(got).to_string(), "foo 42");
        assert!(root_cause(got).downcast_ref::<FormattedError>().is_some());
    }

    #[test]
    fn test_check_as_same_type() {
        let err = errorf!(ErrFoo::default(), "foo");
        assert!(check_as(Some(&err as &(dyn Error + 'static)), &ErrFoo::default()));
    }

    #[test]
    fn test_check_as_different_type() {
        let err = errorf!(ErrFoo::default(), "foo");
        assert!(!check_as(Some(&err as &(dyn Error + 'static)), &ErrBar::default()));
    }

    #[test]
    fn test_check_as_none() {
        assert!(!check_as(None, &ErrFoo::default()));
    }

    #[test]
    fn test_check_as_nested() {
        let inner = errorf!(ErrBar::default(), "disk full");
        let outer = errorf!(ErrFoo::default(), source = inner, "write failed: {source}");
        assert_eq!(outer.to_string(), "write failed: disk full");

        let got: &(dyn Error + 'static) = &outer;
        assert!(check_as(Some(got), &ErrBar::default()));
        assert!(check_as(Some(got), &ErrFoo::default()));
        assert!(!check_as(Some(got), &ErrDnsFailure::default()));
        assert_eq!(find_as::<ErrBar>(got).unwrap().to_string(), "disk full");
        assert_eq!(root_cause(got).to_string(), "disk full");
    }

    #[test]
    fn test_boxed_variant_still_matches() {
        let err: Cause = Box::new(errorf!(ErrFoo::default(), "foo"));
        let got: &(dyn Error + 'static) = &*err;
        assert!(check_as(Some(got), &ErrFoo::default()));

        let err = anyhow::Error::from(errorf!(ErrBar::default(), "bar"));
        assert!(err.downcast_ref::<ErrBar>().is_some());
        let got: &(dyn Error + 'static) = &*err;
        assert!(check_as(Some(got), &ErrBar::default()));
    }

    #[test]
    fn test_dns_failure_end_to_end() {
        let network_err = NetworkError {
            host: "registry.example.com".to_string(),
        };
        let expected = network_err.to_string();

        let err = errorf!(
            ErrDnsFailure::default(),
            source = network_err,
            "lookup failed: {source}"
        );

        assert_eq!(err.to_string(), format!("lookup failed: {expected}"));

        let got: &(dyn Error + 'static) = &err;
        assert!(check_as(Some(got), &ErrDnsFailure::default()));

        let reached = find_as::<NetworkError>(got).unwrap();
        assert_eq!(reached.host, "registry.example.com");
        assert!(std::ptr::eq(
            root_cause(got) as *const dyn Error as *const (),
            reached as *const NetworkError as *const (),
        ));
    }

    #[test]
    fn test_wrapf_function_form() {
        let err = wrapf(ErrFoo::default(), "outer", new("inner"));
        let got: &(dyn Error + 'static) = &err;
        let messages: Vec<String> = chain(got).map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["outer", "outer", "inner"]);
    }

    #[test]
    fn test_formatted_error_source() {
        let plain = FormattedError::new("plain");
        assert_eq!(plain.to_string(), "plain");
        assert!(plain.source().is_none());

        let wrapping = FormattedError::wrapping("outer: EOF", eof());
        assert_eq!(wrapping.to_string(), "outer: EOF");
        assert!(wrapping.source().unwrap().downcast_ref::<io::Error>().is_some());
    }

    #[test]
    fn test_deep_chain_across_threads() {
        let c = errorf!(ErrDnsFailure::default(), "c");
        let b = errorf!(ErrBar::default(), source = c, "b: {source}");
        let a = errorf!(ErrFoo::default(), source = b, "a: {source}");

        let (found, root) = std::thread::spawn(move || {
            let got: &(dyn Error + 'static) = &a;
            (
                check_as(Some(got), &ErrDnsFailure::default()),
                root_cause(got).to_string(),
            )
        })
        .join()
        .unwrap();

        assert!(found);
        assert_eq!(root, "c");
    }

    #[test]
    fn test_borrows_outlive_chain_iterator() {
        let err = errorf!(ErrFoo::default(), source = eof(), "custom: {source}");
        let got: &(dyn Error + 'static) = &err;

        let io_err: &io::Error = {
            let found = find_as::<io::Error>(got);
            found.unwrap()
        };
        let root = root_cause(got);
        let outermost = chain(got).next().unwrap();

        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(root.to_string(), "EOF");
        assert_eq!(outermost.to_string(), "custom: EOF");
    }

    #[test]
    fn test_alternate_format_repeats_layers() {
        let err = anyhow::Error::from(errorf!(ErrFoo::default(), source = new("x"), "w: {source}"));
        assert_eq!(format!("{err}"), "w: x");
        assert_eq!(format!("{err:#}"), "w: x: w: x: x");
    }
}
