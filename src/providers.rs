pub mod base;
pub mod configs;
pub mod events;
pub mod formats;
pub mod gateway;
pub mod portkey;
