pub mod cache;
pub mod db;
pub mod email;
pub mod weather;
pub mod webhook;
