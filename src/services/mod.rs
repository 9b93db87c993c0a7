pub mod document_store;
pub mod library;
pub mod ranking;
