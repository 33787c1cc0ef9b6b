//! Notification dispatch pipeline.
//!
//! For one inserted notification row:
//! 1. Gate on the recipient's conversation preference (`gate`)
//! 2. Resolve the recipient's push tokens (`resolver`)
//! 3. Exchange the service credential and fan out (`dispatcher`)

pub mod dispatcher;
pub mod gate;
pub mod resolver;
pub mod store;
