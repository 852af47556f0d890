#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTransactionResult {
    Inserted(i64),
    AlreadyExists(i64),
}

impl InsertTransactionResult {
    pub fn id(&self) -> i64 {
        match self {
            InsertTransactionResult::Inserted(id) | InsertTransactionResult::AlreadyExists(id) => *id,
        }
    }
}
