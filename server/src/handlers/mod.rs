pub mod session_handlers;
