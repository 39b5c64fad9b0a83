//! Guard system: the capability contract, an ordered registry with runtime
//! switches, shared call recognizers, and the four built-in guards.

pub mod error_handling;
pub mod n_plus_one;
pub mod patterns;
pub mod rate_limit;
pub mod registry;
pub mod tenant_isolation;
pub mod traits;

pub use error_handling::ErrorHandlingGuard;
pub use n_plus_one::NPlusOneGuard;
pub use rate_limit::RateLimitGuard;
pub use registry::GuardRegistry;
pub use tenant_isolation::TenantIsolationGuard;
pub use traits::Guard;
