//! # Media Type Module
//!
//! Parsed representation of MIME type strings as they appear in `Accept`,
//! `Content-Type` and route `produces`/`consumes` declarations.
//!
//! A [`MediaType`] is immutable once parsed. It carries the lowercased type
//! and subtype (either may be `*`), its parameters in declaration order with
//! lowercased keys, and a quality value `q` in `[0, 1]` (default `1.0`).
//!
//! ## Example
//!
//! ```rust
//! use switchyard::media::MediaType;
//!
//! let accept = MediaType::parse_list("text/html, application/json;q=0.9");
//! assert_eq!(accept.len(), 2);
//! assert_eq!(accept[1].quality(), 0.9);
//!
//! let json = MediaType::parse("application/json").unwrap();
//! assert!(json.is_compatible(&MediaType::parse("application/*").unwrap()));
//! ```

mod core;

pub use core::{MediaType, MediaTypeError};
