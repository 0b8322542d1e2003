mod build_tests;
mod common;
mod test_tests;
