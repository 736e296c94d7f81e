//! Untyped errors raised by the GPU backends, built with `bail!` and
//! `format_err!`.

pub use failure::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
