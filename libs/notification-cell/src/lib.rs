pub mod services;

pub use services::email::EmailService;
