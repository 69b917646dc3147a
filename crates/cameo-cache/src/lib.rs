//! Memoization with expiry and request coalescing.
//!
//! [`Memo`] is the object-safe service the engine is handed at startup;
//! [`TtlCache`] is the in-process implementation. [`cached`] combines the
//! two halves of the contract (`get` and `once`) into the read-through
//! pattern every engine entry point uses.

mod memo;
mod ttl;

pub use memo::{Memo, cached};
pub use ttl::TtlCache;
