pub mod identity_registry;
pub mod memory_registry;
