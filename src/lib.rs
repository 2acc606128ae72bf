//! tagblog - a small server-rendered blog
//!
//! Posts carry tags, collect comments and likes, and are shown through four
//! public pages: the front page, a post page, a tag listing and contacts.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
