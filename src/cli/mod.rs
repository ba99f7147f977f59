// Entry points behind the command-line flags
pub mod list;
pub mod run;
