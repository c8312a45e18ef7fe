pub mod ordered_hash_map;
