//! Live-server tests. Start the server with `LIBRARY_ADMIN__PASSWORD=admin`
//! and run with: cargo test --test integration -- --ignored

mod api_tests;
