pub mod gallery_handlers;
pub mod health_handlers;
pub mod object_handlers;
pub mod static_handlers;
