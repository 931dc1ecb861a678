//! Domain types, stage logic and the seams adapters plug into.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod holding;
pub mod importer;
pub mod log;
pub mod normalize;
pub mod sector;
pub mod source;
pub mod stats;
pub mod store;

pub use error::{ExtractionError, SourceError, StoreError};
pub use holding::{HoldingRecord, HoldingSource, NormalizedHolding, RawHolding, Snapshot};
pub use sector::SectorClassifier;
pub use source::HoldingsSource;
pub use store::{FundCatalog, HoldingsStore};
