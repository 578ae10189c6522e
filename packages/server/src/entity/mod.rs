pub mod document;
pub mod image_record;
pub mod owner;
