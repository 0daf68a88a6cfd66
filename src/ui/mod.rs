//! Plain text rendering for books and borrow summaries, and line input.

pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

pub use view::View;
