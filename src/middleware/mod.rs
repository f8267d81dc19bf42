/// Admin authentication middleware for the restock route
pub mod auth;
