//! Integration tests against a mock remote build service

mod test_archive;
mod test_deployer;
mod test_remote_client;
