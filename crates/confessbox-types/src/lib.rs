pub mod keyboard;
pub mod models;
pub mod pagination;
pub mod updates;
