pub(crate) mod constants;
pub mod dtos;
pub mod errors;
pub(crate) mod timestamps;
