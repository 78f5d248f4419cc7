pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod netinfo;
pub mod observability;
pub mod proxy;
pub mod runner;
pub mod state;
pub mod step;
pub mod tls;
pub mod web;
pub mod workflow;
