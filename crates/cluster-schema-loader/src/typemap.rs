//! Mapping from wire column type names to query-language scalar types.

use crate::error::{LoaderError, Result};

/// Map a wire column type name to its scalar type name.
///
/// The enumeration is closed: an unrecognized wire type is an error in both
/// strict and lenient loads.
pub fn scalar_type_of(wire_type: &str) -> Result<&'static str> {
    match wire_type {
        "System.Boolean" => Ok("bool"),
        "System.DateTime" => Ok("datetime"),
        "System.Data.SqlTypes.SqlDecimal" => Ok("decimal"),
        "System.Object" => Ok("dynamic"),
        "System.Guid" => Ok("guid"),
        "System.Int32" => Ok("int"),
        "System.Int64" => Ok("long"),
        "System.Double" => Ok("real"),
        "System.String" => Ok("string"),
        "System.TimeSpan" => Ok("timespan"),
        other => Err(LoaderError::UnmappedColumnType(other.to_string())),
    }
}
