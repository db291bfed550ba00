mod access;
mod audit;
mod link;
mod patch;
mod program;
mod template;

pub use access::*;
pub use audit::*;
pub use link::*;
pub use patch::*;
pub use program::*;
pub use template::*;
