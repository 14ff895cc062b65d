//! Small shared utilities.

pub mod bits;

pub use bits::{
    bin_to_hex, bytes_to_string, get_u16, get_u24, get_u32, get_u64, hex_to_bin, read_bit,
    set_u16, set_u24, set_u32, set_u64, string_to_bytes, write_bit,
};
