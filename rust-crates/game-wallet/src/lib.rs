pub mod encryption;
pub mod funding;
pub mod identity;
pub mod keystore;
pub mod store;
pub mod transactions;
