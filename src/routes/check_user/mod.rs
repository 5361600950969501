mod handler;
mod model;

pub use handler::check_user;
pub use model::{CheckUserRequest, CheckUserResponse};
