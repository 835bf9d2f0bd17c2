//! inkmate — adaptive status-card renderer for 296×152 1-bit e-ink displays.
//!
//! The pipeline: resolve fonts ([`font`]), fit and wrap text ([`layout`]),
//! compose onto a fixed monochrome canvas ([`canvas`]), dispatch scenarios
//! through the registry ([`view`]), and ship results to a device ([`api`]).

pub mod api;
pub mod canvas;
pub mod config;
pub mod font;
pub mod layout;
pub mod view;
