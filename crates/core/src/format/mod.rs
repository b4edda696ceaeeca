pub mod movie_format;
pub mod registry;
