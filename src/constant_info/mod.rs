mod pool;
mod types;

pub use pool::{constant_pool_parser, ConstantPool, MemberRef};
pub use types::*;
