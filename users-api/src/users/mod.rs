pub mod user_models;
pub mod user_service;
pub mod user_source;
