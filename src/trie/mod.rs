mod allot;
mod path_comp;
mod simple;
mod store;
mod walk;

pub use path_comp::PcArtTable;
pub use simple::ArtTable;

//------------ Insert --------------------------------------------------------

/// The outcome of an insertion.
#[derive(Debug, Eq, PartialEq)]
#[must_use]
pub enum Insert<M> {
    /// The route went in.
    Added,
    /// A route with the same prefix was already present; it stays
    /// untouched and the rejected payload is handed back.
    Duplicate(M),
}

impl<M> Insert<M> {
    pub fn is_added(&self) -> bool {
        matches!(self, Insert::Added)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Insert::Duplicate(_))
    }
}
