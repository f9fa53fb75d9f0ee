//! Feature selection utilities.
//!
//! Univariate scoring of features against the label, computed directly from
//! a trained classifier's count tables, and top-k selection that prunes the
//! classifier's vocabulary in place.
pub mod univariate_selection;
