//! XML navigation helpers and the streaming writer.

mod utils;
mod writer;

pub use utils::*;
pub use writer::{NamespacePrefixes, XmlWriter};
