pub mod command;
pub mod context;
pub mod line;
pub mod response;
pub mod speaker;
