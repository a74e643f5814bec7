//! Record normalization
//!
//! Turns nested JSON records into flat rows ready for a relational
//! destination:
//!
//! - keys become snake_case identifiers
//! - nested objects are flattened into the parent row (`address__city`)
//! - arrays become child tables (`orders__items`) linked through
//!   `_parent_id` and ordered by `_list_idx`
//! - every row carries `_load_id` and `_row_id`

mod flatten;
mod naming;

pub use flatten::{
    NormalizedPage, Normalizer, LIST_INDEX_COLUMN, LOAD_ID_COLUMN, PARENT_ID_COLUMN,
    ROW_ID_COLUMN, VALUE_COLUMN,
};
pub use naming::{join_path, normalize_identifier, PATH_SEPARATOR};

#[cfg(test)]
mod tests;
