// src/display/mod.rs
//! Display front-ends for decoded GPS data

pub mod terminal;

pub use terminal::TerminalDisplay;
