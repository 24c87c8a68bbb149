//! Test utilities shared across crate-level unit tests.

pub mod credentials;
pub mod http;

pub use credentials::{
    service_account_key, write_key_file, TEST_CLIENT_EMAIL, TEST_RSA_PRIVATE_KEY,
    TEST_RSA_PUBLIC_KEY,
};
pub use http::start_mock_server;
