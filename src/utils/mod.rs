pub mod cookie_utils;
pub mod logging;
pub mod responses;
pub mod validation;
