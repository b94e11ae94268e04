pub mod handlers;
pub mod render;
pub mod router;
