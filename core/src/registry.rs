//! Type registry (C2): maps `(class, tag)` to the decoder that handles it.
//!
//! Rather than building this table at runtime via decorator-style
//! registration calls, it's a `const` table built at compile time;
//! `Value::decode_value`'s match arms *are* the dispatch, this module
//! exists to name the mapping explicitly and let callers ask "is this
//! `(class, tag)` registered?" without attempting a decode, and to
//! guarantee registration keys stay globally unique.

use crate::tag::{application, context, universal, Class, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub class: Class,
    pub tag: u32,
    pub name: &'static str,
}

/// All statically known `(class, tag)` pairs. Unknown pairs fall back to
/// `Value::Unknown` at decode time rather than erroring.
pub const ENTRIES: &[RegistryEntry] = &[
    RegistryEntry { class: Class::Universal, tag: universal::BOOLEAN, name: "BOOLEAN" },
    RegistryEntry { class: Class::Universal, tag: universal::INTEGER, name: "INTEGER" },
    RegistryEntry { class: Class::Universal, tag: universal::OCTET_STRING, name: "OCTET STRING" },
    RegistryEntry { class: Class::Universal, tag: universal::NULL, name: "NULL" },
    RegistryEntry { class: Class::Universal, tag: universal::OBJECT_IDENTIFIER, name: "OBJECT IDENTIFIER" },
    RegistryEntry { class: Class::Universal, tag: universal::SEQUENCE, name: "SEQUENCE" },
    RegistryEntry { class: Class::Universal, tag: universal::SET, name: "SET" },
    RegistryEntry { class: Class::Universal, tag: universal::PRINTABLE_STRING, name: "PrintableString" },
    RegistryEntry { class: Class::Universal, tag: universal::IA5_STRING, name: "IA5String" },
    RegistryEntry { class: Class::Universal, tag: 0x0C, name: "UTF8String" },
    RegistryEntry { class: Class::Universal, tag: 0x14, name: "T61String" },
    RegistryEntry { class: Class::Universal, tag: 0x1A, name: "VisibleString" },
    RegistryEntry { class: Class::Universal, tag: universal::UTC_TIME, name: "UTCTime" },
    RegistryEntry { class: Class::Application, tag: application::IP_ADDRESS, name: "IpAddress" },
    RegistryEntry { class: Class::Application, tag: application::COUNTER32, name: "Counter32" },
    RegistryEntry { class: Class::Application, tag: application::GAUGE32, name: "Gauge32" },
    RegistryEntry { class: Class::Application, tag: application::TIME_TICKS, name: "TimeTicks" },
    RegistryEntry { class: Class::Application, tag: application::OPAQUE, name: "Opaque" },
    RegistryEntry { class: Class::Application, tag: application::NSAP_ADDRESS, name: "NsapAddress" },
    RegistryEntry { class: Class::Application, tag: application::COUNTER64, name: "Counter64" },
    RegistryEntry { class: Class::Context, tag: context::NO_SUCH_OBJECT, name: "noSuchObject" },
    RegistryEntry { class: Class::Context, tag: context::NO_SUCH_INSTANCE, name: "noSuchInstance" },
    RegistryEntry { class: Class::Context, tag: context::END_OF_MIB_VIEW, name: "endOfMibView" },
];

pub fn lookup(info: TypeInfo) -> Option<&'static RegistryEntry> {
    ENTRIES.iter().find(|e| e.class == info.class && e.tag == info.tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_keys_are_globally_unique() {
        for (i, a) in ENTRIES.iter().enumerate() {
            for b in &ENTRIES[i + 1..] {
                assert!(
                    !(a.class == b.class && a.tag == b.tag),
                    "duplicate registry key: {:?}/{} used by both {} and {}",
                    a.class,
                    a.tag,
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn unknown_pair_is_not_registered() {
        assert!(lookup(TypeInfo::new(Class::Private, crate::tag::Pc::Primitive, 77)).is_none());
    }
}
