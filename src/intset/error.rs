#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IntSetError {
    #[error("empty collection")]
    EmptyCollection,
    #[error("corrupt intset blob: {0}")]
    Corrupt(&'static str),
}
