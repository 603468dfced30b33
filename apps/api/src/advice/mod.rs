//! Advice pipeline: turns a client narrative into a filled advisory document.
//!
//! Data flow: narrative → classifier → Template Store lookup → research notes →
//! resolver/collapser per template → filler → `FilledDocument`.

pub mod catalog;
pub mod classifier;
pub mod collapser;
pub mod filler;
pub mod handlers;
pub mod input;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod research;
pub mod resolver;
pub mod rules;
pub mod scanner;
pub mod screening;

#[cfg(test)]
pub mod testing;
