mod photo;

pub use photo::*;
