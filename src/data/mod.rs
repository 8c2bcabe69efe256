/// Data layer: metadata tokens, report extraction, dataset build and persistence.
///
/// Architecture:
/// ```text
///   data/**/*.xls
///        │
///        ▼
///   ┌──────────┐   metadata: path token → 6 fields
///   │ builder   │   extract:  report text → Measurement
///   └──────────┘
///        │  Dataset + unprocessed + dataless
///        ▼
///   ┌──────────┐
///   │  writer   │  records.csv / records.parquet / side lists
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  artifact → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  query predicates → filtered rows
///   └──────────┘
/// ```

pub mod builder;
pub mod extract;
pub mod filter;
pub mod loader;
pub mod metadata;
pub mod model;
pub mod writer;
