pub mod calendar;
pub mod lifecycle;
pub mod notifications;
pub mod ratelimit;
pub mod timezone;
pub mod token;
