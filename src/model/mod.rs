pub mod config;
pub mod node;
pub mod path_index;
pub mod session;
pub mod tree;

pub use config::*;
pub use node::*;
pub use path_index::*;
pub use session::*;
pub use tree::*;
