#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, unused)]
#![allow(clippy::too_many_arguments)]

//! A conformance test harness that probes an HTTP/2 client implementation
//! for adherence to RFC 7540 (HTTP/2) and RFC 7541 (HPACK) by acting as a
//! deliberately misbehaving server.

pub mod cases;
pub mod cert;
pub mod driver;
pub mod flags;
pub mod hpack;
pub mod socket;
pub mod types;
pub mod verifier;

mod frame;

pub use frame::Frame;
pub use verifier::Verdict;
