mod bitmap;
mod cache;
mod claim;
mod command;
mod error;
mod glyph;
mod opcode;
mod service;

pub use bitmap::{BitmapAsset, BitmapTable};
pub use cache::{CommandCache, LineCache, LineUpdate};
pub use claim::claim_screen;
pub use command::{DrawCommand, DEFAULT_TEXT_FLAGS, FLAG_INVERTED, FLAG_OPAQUE};
pub use error::PresentationError;
pub use glyph::translate as translate_glyphs;
pub use service::PresentationService;
