pub mod connection;
pub mod dispatcher;
pub mod thread_index;
