// FaaS cache simulator library

pub mod error;
pub mod generator;
pub mod input;
pub mod models;
pub mod runner;
pub mod stats;
