pub mod challenge;
pub mod did;
pub mod document;
pub mod resolution;
pub mod user;
