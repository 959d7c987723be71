use std::fmt;

use super::array::physical_type::PhysicalType;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Days since the unix epoch.
    Date32,
    Utf8,
    Binary,
}

impl DataType {
    pub const fn physical_type(&self) -> PhysicalType {
        match self {
            Self::Boolean => PhysicalType::Boolean,
            Self::Int16 => PhysicalType::Int16,
            Self::Int32 | Self::Date32 => PhysicalType::Int32,
            Self::Int64 => PhysicalType::Int64,
            Self::Float32 => PhysicalType::Float32,
            Self::Float64 => PhysicalType::Float64,
            Self::Utf8 => PhysicalType::Utf8,
            Self::Binary => PhysicalType::Binary,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Date32 => "Date32",
            Self::Utf8 => "Utf8",
            Self::Binary => "Binary",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
