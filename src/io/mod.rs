//! On-disk encodings for node records

pub mod records;
