pub mod day_runner;
pub mod report_store;
