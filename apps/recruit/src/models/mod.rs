pub mod candidate;
pub mod history;
