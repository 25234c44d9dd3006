//! Bounded-concurrency mapping.
//!
//! A fixed number of workers pull item indices from a shared cursor until it
//! runs out, so at most `concurrency` worker calls are ever in flight and the
//! output keeps the input order.

mod bounded;
mod dispatch;
#[cfg(feature = "async")]
mod async_map;

pub use bounded::{map_limit, BoundedMapper};
#[cfg(feature = "async")]
pub use async_map::map_limit_async;
