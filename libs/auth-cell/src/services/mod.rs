pub mod account;
pub mod identity;
