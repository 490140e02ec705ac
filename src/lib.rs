pub mod accumulator;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod model;
pub mod shell;
pub mod util;
