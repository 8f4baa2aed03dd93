pub mod entities;
pub mod errors;
pub mod password;
pub mod token;
