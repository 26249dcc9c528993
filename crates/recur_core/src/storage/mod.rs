pub mod local_state;
