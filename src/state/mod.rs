pub mod commands;
pub mod lobby;
pub mod server_state;
