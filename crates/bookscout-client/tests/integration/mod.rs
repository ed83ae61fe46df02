mod backend_tests;
pub mod common;
