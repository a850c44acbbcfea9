pub mod engagement;
pub mod portfolio;
pub mod request;
pub mod session;
pub mod user;
