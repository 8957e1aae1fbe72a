pub mod emitter;
pub mod rate_limit;
pub mod send_window;
