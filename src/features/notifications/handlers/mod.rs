pub mod sse_handler;
