//! Core plan logic: types, parsing, graph resolution, planning, lock state
//! and rendering.

pub mod error;
pub mod graph;
pub mod hasher;
pub mod parser;
pub mod planner;
pub mod render;
pub mod resource;
pub mod state;
pub mod types;
