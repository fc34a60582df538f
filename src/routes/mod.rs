pub mod api;
pub mod appointments;
pub mod catalog;
pub mod consent;
pub mod media;
pub mod members;
pub mod public;
