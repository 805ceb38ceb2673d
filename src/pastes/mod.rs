pub mod error;
pub mod id;
pub mod store;

pub use error::{NotFoundReason, PasteError, PasteResult};
pub use id::{generate_id, ID_LENGTH};
pub use store::{OpenedPaste, PasteStore};
