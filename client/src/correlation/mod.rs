pub mod correlation_table;
pub mod pending_requests;
