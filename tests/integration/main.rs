//! Integration tests across the public crate API.

mod bot_session;
mod store_api;
