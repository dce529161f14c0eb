pub mod access_codes;
pub mod access_requests;
pub mod health;
pub mod notifications;
pub mod security;
pub mod sensitive_data;
