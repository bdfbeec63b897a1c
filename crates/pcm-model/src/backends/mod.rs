//! Shipped math backends.
//!
//! Each backend wraps an existing solver and exposes it through the
//! [`MathBackend`](crate::traits::MathBackend) trait.

mod clarabel;

pub use clarabel::ClarabelBackend;
