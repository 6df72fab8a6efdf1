pub mod field_authorization;
pub mod hooks;
pub mod plugin_trait;
