pub mod codec;
pub mod health_service;
pub mod message_service;
pub mod rate_limit_service;
pub mod token_service;
