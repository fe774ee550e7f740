//! HTTP request handlers
//!
//! This module organizes the API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `synthesize` - Text-to-speech synthesis endpoint
//! - `voices` - Voice listing endpoint
//! - `usage` - Usage statistics endpoint
//! - `profile` - User profile endpoint

pub mod api;
pub mod profile;
pub mod synthesize;
pub mod usage;
pub mod voices;
