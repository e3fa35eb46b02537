//! Route handlers for the HTTP API.

pub mod events;
pub mod form;
pub mod health;
pub mod page;
pub mod resources;
pub mod tools;
