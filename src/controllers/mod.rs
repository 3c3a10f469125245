pub mod create_account;
pub mod log_in_account;

pub use create_account::*;
pub use log_in_account::*;
