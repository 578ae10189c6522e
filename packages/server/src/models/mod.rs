pub mod image;
pub mod owner;
pub mod shared;
