//! Kraken spot exchange integration.

pub mod auth;
pub mod client;
pub mod dto;

pub use client::KrakenClient;
