//! End-to-end tests across the model, resolver and validator
//!
//! Organized by what they exercise: fixed editing scenarios, and properties
//! checked over every entity of a fixture document.

mod helpers;
mod property_tests;
