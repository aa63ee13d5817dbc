pub mod builder;
pub mod colors;

pub use builder::{BuildElement, LdrawBuilder, Placement, IDENTITY};
