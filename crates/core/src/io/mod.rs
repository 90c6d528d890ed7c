//! Reading and writing point patterns, distance tables and results

mod json;

pub use json::{
    point_set_from_str, point_set_to_string, read_point_set, read_tabulated_pattern,
    tabulated_pattern_from_str, write_json, write_point_set, write_tabulated_pattern,
};
