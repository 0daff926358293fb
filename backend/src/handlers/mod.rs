//! HTTP handlers for the Branch Inventory Management Platform

pub mod health;
pub mod inventory;
pub mod sale;
pub mod stock_in;

pub use health::health_check;
pub use inventory::*;
pub use sale::*;
pub use stock_in::*;
