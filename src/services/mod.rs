pub mod api_server;
pub mod authenticator;
pub mod challenge_store;
pub mod document_builder;
pub mod identity_manager;
pub mod registry_client;
pub mod sweeper;
