pub mod cli;
pub mod stores;
