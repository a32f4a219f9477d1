pub mod info;
pub mod serve;
pub mod validate;
