#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph contains no nodes")]
    EmptyGraph,
    #[error("parent chain starting at `{node_id}` does not terminate")]
    CyclicHierarchy { node_id: String },
    #[error("a layout pass is already in flight")]
    PassInFlight,
}

pub type Result<T> = std::result::Result<T, Error>;
