pub mod app_config;
pub mod db;
pub mod email;
pub mod error;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod session;
pub mod survey;
pub mod token;
pub mod user;
pub mod web;
