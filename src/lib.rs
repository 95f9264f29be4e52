pub mod crypto;
pub mod errors;
pub mod model;
pub mod search;
pub mod vault;
