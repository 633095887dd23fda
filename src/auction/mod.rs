pub mod commands;
pub mod events;
pub mod lifecycle;
pub mod model;
