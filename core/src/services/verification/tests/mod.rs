
mod abuse_check_tests;
mod memory_store_tests;
