pub mod document;
pub mod health;
pub mod image;
pub mod maintenance;
pub mod owner;
