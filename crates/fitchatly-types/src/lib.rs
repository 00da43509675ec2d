pub mod api;
pub mod assistant;
pub mod channel;
pub mod events;
