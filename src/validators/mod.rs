pub mod query_validator;
pub mod upload_validator;
