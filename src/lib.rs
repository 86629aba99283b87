//! Blueprint Engine: diversity-constrained story blueprint selection.
//!
//! Picks one option per catalog category (story structure, character
//! archetype, world flavor, conflict, tone, innovation groups) under
//! recency-based avoidance rules, scores how far each blueprint strays from
//! recent history, and feeds that score back into how adventurous the next
//! selection is allowed to be.

pub mod core;
pub mod schema;
