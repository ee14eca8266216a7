//! Application services layer.

pub mod error;
pub mod feed;
pub mod likes;
pub mod pagination;
pub mod repos;
