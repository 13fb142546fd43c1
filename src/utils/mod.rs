pub mod buffers;
pub mod config;
pub mod logging;
pub mod mathf;
pub mod weapondb;
