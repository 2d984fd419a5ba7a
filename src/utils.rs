pub mod logging;
pub mod retry;
pub mod template;
