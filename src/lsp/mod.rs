pub mod backend;
pub mod completion;
pub mod config;
pub mod document;
pub mod errors;
pub mod lexer;
pub mod models;
pub mod position;
pub mod scanner;
