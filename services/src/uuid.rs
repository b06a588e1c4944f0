use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
pub fn stable_uuid(id: &str) -> Uuid {
    // Any namespace works as long as it never changes; URL is a convenient default.
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}
