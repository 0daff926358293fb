//! Business logic services for the Branch Inventory Management Platform

pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod sale;
pub mod stock_in;

pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use ledger::{build_store, LedgerStore};
pub use sale::SaleService;
pub use stock_in::StockInService;
