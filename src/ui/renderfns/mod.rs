pub mod book;
pub mod header;
pub mod help;
pub mod table;
pub mod utils;

pub use book::{book_detail, book_table, summary_table};
pub use header::header;
pub use help::help;
