mod book_detail;
mod book_list;
mod borrow_summary;

pub use book_detail::BookDetailView;
pub use book_list::BookListView;
pub use borrow_summary::BorrowSummaryView;
