#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub(crate) mod api;
pub mod app;
pub mod cache;
pub mod clients;
pub mod config;
pub mod models;
pub mod observability;
pub mod report;
pub(crate) mod schema;
pub mod scoring;
pub(crate) mod util;
