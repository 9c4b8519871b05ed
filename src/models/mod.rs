pub mod driver;
pub mod quote;
pub mod ride;
