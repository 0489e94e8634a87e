pub mod plot;
pub mod store;
