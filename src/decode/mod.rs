//! Response decoding
//!
//! Response bodies are JSON. A [`RecordSelector`] picks the records of a
//! page out of the body, either through a configured data selector or by
//! auto-detecting the list of records.

mod selector;

pub(crate) use selector::extract_simple_path;
pub use selector::RecordSelector;
