//! Server-rendered paste pages (`/p/{id}`).

pub mod handlers;
pub mod render;

pub use handlers::view_paste;
pub use render::escape_html;
