//! Key layout.
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | record | `{collection}:{id}` | sealed record |
//! | index | `{collection}#{index}:{hex(value)}:{id}` | id |
//! | unique index | `{collection}!{index}:{hex(value)}` | id |
//! | sequence | `~seq:{name}` | sealed `u64` |
//!
//! Index values are hex-encoded so a value containing `:` cannot collide
//! with a longer value sharing its prefix.

pub fn record_prefix(collection: &str) -> Vec<u8> {
    format!("{collection}:").into_bytes()
}

pub fn record(collection: &str, id: &str) -> Vec<u8> {
    format!("{collection}:{id}").into_bytes()
}

pub fn index_prefix(collection: &str, index: &str, value: &str) -> Vec<u8> {
    format!("{collection}#{index}:{}:", hex::encode(value)).into_bytes()
}

pub fn index(collection: &str, index: &str, value: &str, id: &str) -> Vec<u8> {
    let mut key = index_prefix(collection, index, value);
    key.extend_from_slice(id.as_bytes());
    key
}

pub fn unique(collection: &str, index: &str, value: &str) -> Vec<u8> {
    format!("{collection}!{index}:{}", hex::encode(value)).into_bytes()
}

pub fn sequence(name: &str) -> Vec<u8> {
    format!("~seq:{name}").into_bytes()
}
