pub mod error;
pub mod llm_config;
pub mod persona;
pub mod testcase;
