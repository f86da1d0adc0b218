//! Upstream access, decoding and columnar export

pub mod catalog;
pub mod columns;
pub mod decode;
pub mod http;
pub mod memory;
pub mod provider;
pub mod schema;
pub mod synthetic;

pub use catalog::{Partition, SubgroupCatalog, SubgroupEntry, TOTAL_COLUMN, TOTAL_LABEL};
pub use columns::{CanonicalColumn, ColumnMap};
pub use decode::decode_table;
pub use http::HttpProvider;
pub use memory::MemoryProvider;
pub use provider::{ProviderError, ProviderTable, UpstreamProvider};
pub use schema::{tidy_to_dataframe, wide_to_dataframe, EnrollmentSchema};
pub use synthetic::{synthetic_provider, synthetic_table};
