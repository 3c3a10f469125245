pub mod configuration;
pub mod controllers;
pub mod domain;
pub mod helper;
pub mod middlewares;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod telemetry;
