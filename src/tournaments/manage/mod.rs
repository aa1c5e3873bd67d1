pub mod config;
pub mod sidebar;
