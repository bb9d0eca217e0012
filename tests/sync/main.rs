// Test harness entry point for sync integration tests

mod scan_tests;
