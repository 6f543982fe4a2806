pub mod auth;
pub mod engagement;
pub mod exercises;
pub mod feed;
pub mod groups;
pub mod permissions;
pub mod posts;
pub mod search;
pub mod social;
pub mod users;
