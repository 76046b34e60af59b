// Application layer: quote editing sessions, the quote/invoice service,
// dashboard statistics and the text preview.

pub mod editor;
pub mod error;
pub mod preview;
pub mod reporting;
pub mod service;

pub use editor::*;
pub use error::*;
pub use preview::*;
pub use reporting::*;
pub use service::*;
