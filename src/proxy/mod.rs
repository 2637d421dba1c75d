//! Backend proxy contract
//!
//! Wire types for the two proxy routes and the transport seam the
//! orchestrator talks through.

mod traits;
mod types;

pub use traits::ProxyTransport;
pub use types::*;
