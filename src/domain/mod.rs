mod catalog;
mod client;
mod company;
mod draft;
mod invoice;
mod ledger;
mod line_item;
mod money;
mod quote;
mod session;

pub use catalog::*;
pub use client::*;
pub use company::*;
pub use draft::*;
pub use invoice::*;
pub use ledger::*;
pub use line_item::*;
pub use money::*;
pub use quote::*;
pub use session::*;
