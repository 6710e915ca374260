//! Rendering of replies and reports.
//!
//! Everything the binary prints goes through [`json`]: pretty JSON either to
//! stdout or to a file named by `--out`.

pub mod json;
