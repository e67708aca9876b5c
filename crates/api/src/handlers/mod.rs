pub mod contributions;
pub mod districts;
pub mod review;
