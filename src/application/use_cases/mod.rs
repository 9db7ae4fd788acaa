pub mod generate_testcases;
