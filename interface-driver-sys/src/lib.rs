//! Unsafe OS glue for `interface-driver`.
//!
//! Mirrors the shape of `libvfio-user-sys`: a small, deliberately thin layer of `unsafe`
//! wrappers around raw OS facilities, with no policy of its own. `interface-driver` is the
//! safe API built on top.

pub mod context;
pub mod mman;
pub mod signal;
