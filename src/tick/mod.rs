pub mod delta_sync;
pub mod lobby_tick;
