//! Clients for systems outside the database: email, the AI composer and link files.

pub mod links;
pub mod mailer;
pub mod openai;
