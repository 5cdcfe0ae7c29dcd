//! Catalog module.
//!
//! The catalog is an external collaborator; this module only models the
//! pieces the cart reads: variants with live stock and sneaker reference prices.

mod reader;
mod variant;

pub use reader::{CatalogReader, InMemoryCatalog, MockCatalogReader, SneakerSummary};
pub use variant::{CompositeVariantKey, Variant, VariantRef};
