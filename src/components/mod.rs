pub mod preview;
pub mod tools;
