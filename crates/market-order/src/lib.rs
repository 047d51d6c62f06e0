//! Order-side logic of the marketplace: normalization of untrusted order
//! payloads, construction of listing orders, settlement valuation, and
//! recorded-fingerprint verification.

pub mod builder;
pub mod fingerprint;
pub mod normalize;
pub mod valuation;

pub use builder::*;
pub use fingerprint::*;
pub use normalize::*;
pub use valuation::*;
