//! Typed encoding/decoding.
//!
//! - [`value`]: reading and writing typed values on nodes, one getter/setter
//!   pair per [`DataType`](crate::DataType)
//! - [`field`]: converting typed values to and from field text

pub mod field;
pub mod value;

pub use field::{parse_field_text, to_field_text, FieldText, FieldTextError};
pub use value::{decode_value, decode_values, encode_value};
