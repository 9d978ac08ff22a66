//! Shared test utilities for the bulk data collector workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A stub collector that answers every report with a fixed status
//! - Fixed device identities, timestamps and report bodies
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, StubCollector};
//! ```

pub mod fixtures;
pub mod stub;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use stub::{refused_base_url, CapturedRequest, StubCollector};

/// Assert that line `$n` (0-based) of a text body equals `$expected`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_body_line;
///
/// assert_body_line!(body, 0, "ReportTimestamp,ParameterName,ParameterValue,ParameterType");
/// ```
#[macro_export]
macro_rules! assert_body_line {
    ($body:expr, $n:expr, $expected:expr) => {{
        let text = ::std::string::String::from_utf8_lossy(&$body[..]).into_owned();
        let line = text.split('\n').nth($n);
        if line != ::std::option::Option::Some($expected) {
            panic!(
                "assertion failed: line {} of body\n  expected: `{}`\n     found: `{:?}`\n      body:\n{}",
                $n, $expected, line, text
            );
        }
    }};
}
