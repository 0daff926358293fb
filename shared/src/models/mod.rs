//! Domain models for the Branch Inventory Management Platform

mod catalog;
mod inventory;
mod sale;
mod stock_in;

pub use catalog::*;
pub use inventory::*;
pub use sale::*;
pub use stock_in::*;
