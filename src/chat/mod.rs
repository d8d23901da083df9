pub mod controller;
pub mod input;
pub mod markup;
pub mod resolver;
pub mod transcript;
