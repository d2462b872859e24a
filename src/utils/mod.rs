pub mod codes;
pub mod redact;
pub mod suggest;
pub mod text;
pub mod time_format;
pub mod tool_errors;
