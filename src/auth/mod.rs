pub mod middleware;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod session;
