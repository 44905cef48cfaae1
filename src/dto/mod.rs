pub mod articles;
pub mod auth;
pub mod orders;
pub mod products;
