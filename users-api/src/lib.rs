pub mod api {
    pub mod endpoints;
    pub mod errors;
}
pub mod config;
pub mod router;
pub mod server;
pub mod state;
pub mod types;
pub mod users;
