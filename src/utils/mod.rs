pub mod client_ip;
pub mod code_gen;
pub mod url_validator;

pub use code_gen::{ALPHABET, CodeGenerator, DEFAULT_CODE_LENGTH};
pub use url_validator::{UrlValidationError, validate_url};
