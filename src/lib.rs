//! # fgl-grammars
//!
//! Tooling for the 4GL (`source.4gl`) and PER (`source.per`) syntax grammars.
//!
//! - [grammar]: load YAML grammars, resolve their `{{variable}}` placeholders and
//!   write self-contained plist or JSON grammars
//! - [scan]: the tokenizer interface a regex scanning backend implements
//! - [baseline]: render tokenization traces of sample files, cross-check them with the
//!   other grammar and compare them with approved baselines
//! - [settings]: layered configuration
//! - [logging]: tracing subscriber setup
//!
//! The crate does not ship a scanner. Callers plug one in through
//! [`scan::ScannerBackend`].

pub mod baseline;
pub mod grammar;
pub mod logging;
pub mod scan;
pub mod settings;
