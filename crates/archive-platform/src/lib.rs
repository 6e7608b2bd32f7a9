pub mod llm;
pub mod storage;

pub use llm::model_for;
pub use storage::open_storage;
