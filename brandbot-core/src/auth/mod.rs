// =============================================================================
// brandbot-core/src/auth/mod.rs
//   Password hashing, in-memory sessions and tenant resolution.
// =============================================================================

pub mod password;
pub mod session;
pub mod tenant;

pub use session::SessionStore;
pub use tenant::{
    FirstCompanyResolver, HeaderTenantResolver, SessionTenantResolver, TenantStrategy,
};
