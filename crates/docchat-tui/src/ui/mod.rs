//! Terminal rendering.

pub mod markup;
mod render;

pub use render::{chat_lines, render};
