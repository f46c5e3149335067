//! Local client state: the `~/.hyper` directory and its config file

pub mod config;
pub mod paths;
