mod common;

mod documents;
mod images;
mod maintenance;
mod owners;
