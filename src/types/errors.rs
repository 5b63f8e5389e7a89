use std::fmt;

//------------ StrideError ---------------------------------------------------

/// Possible errors while validating a stride schedule.
#[derive(Debug, PartialEq, Eq)]
pub enum StrideError {
    /// The schedule contains no levels at all.
    EmptySchedule,
    /// A single stride must cover between 1 and 24 bits, so that one index
    /// extraction spans at most four bytes of the address.
    StrideOutOfRange { level: usize, stride: u8 },
    /// The strides of a schedule must sum to exactly the bit width of the
    /// address family the table is built for.
    SumMismatch { sum: u16, addr_bits: u8 },
}

impl std::error::Error for StrideError {}

impl fmt::Display for StrideError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StrideError::EmptySchedule => {
                write!(f, "Error: The stride schedule is empty.")
            }
            StrideError::StrideOutOfRange { level, stride } => {
                write!(
                    f,
                    "Error: Stride of {} bits at level {} is outside the \
                    supported range of 1..=24.",
                    stride, level
                )
            }
            StrideError::SumMismatch { sum, addr_bits } => {
                write!(
                    f,
                    "Error: The strides sum to {} bits, but the address \
                    family has {} bits.",
                    sum, addr_bits
                )
            }
        }
    }
}

//------------ TableError ----------------------------------------------------

/// Possible errors returned by methods on a routing table.
#[derive(Debug, PartialEq, Eq)]
pub enum TableError {
    /// The prefix handed in belongs to the other address family than the
    /// one the table was built for.
    FamilyMismatch,
}

impl std::error::Error for TableError {}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TableError::FamilyMismatch => {
                write!(
                    f,
                    "Error: The prefix does not belong to the address \
                    family of this table."
                )
            }
        }
    }
}
