pub mod paste;

pub use paste::{
    CreatePasteRequest, CreatePasteResponse, NewPaste, PasteRecord, PasteView, ValidationError,
};
