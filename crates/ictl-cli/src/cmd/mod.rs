pub mod auth;
pub mod image;
pub mod org;
pub mod project;
pub mod replica;
pub mod secret;
pub mod service;
pub mod stack;
