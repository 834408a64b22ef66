//! HTTP API handlers

pub mod health;
pub mod leads;
pub mod tasks;
pub mod uploads;
pub mod whatsapp;
