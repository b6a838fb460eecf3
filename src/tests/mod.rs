mod cache_tests;
mod codegen_tests;
mod property_tests;
