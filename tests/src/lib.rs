//! # Quantum-Chain Auth Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Real node on ephemeral ports, driven through RpcClient
//!     ├── auth_endpoints.rs
//!     └── listeners.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::auth_endpoints
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
