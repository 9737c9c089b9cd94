pub mod filter;
pub mod report;
