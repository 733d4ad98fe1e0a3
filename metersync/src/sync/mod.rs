pub mod backoff;
pub mod cycle;
pub mod poller;
pub mod reauth;
pub mod scheduler;
