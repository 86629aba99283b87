//! Plain data passed in and out of the engine.

pub mod blueprint;
pub mod record;
pub mod report;
