pub mod report;
pub mod staging;
