//! Top-level facade crate for envbus.
//!
//! Re-exports the protocol core and the runtime so embedders can depend on a
//! single crate.

pub mod core {
    pub use envbus_core::*;
}

pub mod runtime {
    pub use envbus_runtime::*;
}
