pub mod actor_channel;
pub mod object_ref_map;
