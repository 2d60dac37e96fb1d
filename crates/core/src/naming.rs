//! Resource-type naming for observed entities.

/// An entity whose state changes are reported externally.
pub trait ResourceEntity {
    /// Fully-qualified, dot-separated type name, e.g.
    /// `"com.cloud.network.Network"`.
    fn type_name() -> &'static str;

    /// Externally visible identifier, if one has been assigned.
    fn uuid(&self) -> Option<&str>;
}

/// Short resource-type name: the segment after the last `.` of a qualified
/// type name. A name without a dot is returned unchanged.
///
/// ```
/// use statebus_core::naming::entity_name_from_type_name;
///
/// assert_eq!(entity_name_from_type_name("com.cloud.network.Network"), "Network");
/// assert_eq!(entity_name_from_type_name("Network"), "Network");
/// ```
pub fn entity_name_from_type_name(type_name: &str) -> &str {
    match type_name.rfind('.') {
        Some(i) => &type_name[i + 1..],
        None => type_name,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
