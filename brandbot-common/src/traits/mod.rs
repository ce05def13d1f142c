// File: brandbot-common/src/traits/mod.rs
pub mod repository_traits;
pub mod tenant_traits;
