pub mod str_utils;
pub mod time_utils;
