pub mod palette;
pub mod try_on;
