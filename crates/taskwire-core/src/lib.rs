//! Core domain types and services for taskwire.

pub mod agenda;
pub mod auth;
pub mod backend;
pub mod config;
pub mod document;
pub mod input;
pub mod query;
pub mod report;
pub mod service;
pub mod sync;
pub mod task;
