pub mod definition;
pub mod json;
pub mod node;

pub use definition::*;
pub use node::*;
