pub mod api;
pub mod auth;
pub mod configuration;
pub mod db;
pub mod entity;
pub mod migration;
pub mod model;
pub mod notify;
pub mod pages;
pub mod sentiment;
pub mod service;
pub mod startup;
pub mod telemetry;
