pub mod actions;
pub mod asserts;

#[allow(unused_imports)]
pub use actions::*;
#[allow(unused_imports)]
pub use asserts::*;
