//! Pricing Service - plans, customers, subscriptions and invoicing over REST.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
