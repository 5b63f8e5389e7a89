mod bit_span;
mod prefix_id;

pub mod af;
pub mod prefix_record;

pub use af::AddressFamily;
pub use bit_span::BitSpan;
pub(crate) use prefix_id::PrefixId;

pub mod errors;
pub mod stats;
