pub mod error;
pub mod flags;
pub mod shell;

pub mod core;
pub mod input;
pub mod jobs;
pub mod parser;
pub mod path;
pub mod process;
