//! Lifecycle engine integration tests.

mod cascade;
mod crud;
mod support;
