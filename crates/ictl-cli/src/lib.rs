pub mod app;
pub mod cmd;
pub mod output;
