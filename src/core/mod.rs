//! The selection engine and its collaborators.

pub mod adaptive;
pub mod catalog;
pub mod config;
pub mod constraint;
pub mod diversity;
pub mod history;
pub mod innovation;
pub mod observer;
pub mod pipeline;
pub mod selector;
