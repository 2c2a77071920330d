// === PUBLIC CONTRACT ===
// Plain data types shared with other crates (no serde, no ORM types)
pub mod contract;

pub use contract::model;

// === WIRING ===
pub mod module;
pub use module::UsersModule;

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed only for comprehensive testing and should NOT be used by external consumers.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
