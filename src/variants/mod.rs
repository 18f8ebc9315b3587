pub mod store;

pub use store::VariantStore;
