use registration::UserRegistrationService;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod registration;
pub mod router;
pub mod routes;
pub mod shutdown;

#[derive(Clone)]
pub struct AppState {
    pub registrations: UserRegistrationService,
}
