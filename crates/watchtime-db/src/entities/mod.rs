pub mod library_entry;
pub mod provider;
pub mod provider_log;
pub mod provider_option;
