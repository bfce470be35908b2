//! Lots, capacity and spots

pub mod dto;
pub mod handlers;
