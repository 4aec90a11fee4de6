//! Property test modules

mod notify_tests;
mod orchestrator_tests;
mod parser_tests;
mod report_tests;
mod strategies;
