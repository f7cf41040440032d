//! Binding scripts shipped with swivel.
//!
//! A binding script is Rust code building a [`Session`]: which headers to
//! parse and what to claim from each. Scripts are selected by name on the
//! command line.

pub mod rizin;

use crate::ops::generate::Session;

/// A named binding script.
pub struct Script {
    pub name: &'static str,
    pub description: &'static str,
    pub session: fn() -> Session,
}

/// Every script, in the order `swivel generate --list` shows them.
pub const SCRIPTS: &[Script] = &[Script {
    name: "rizin",
    description: "rz_core.h and the list generics it depends on",
    session: rizin::session,
}];

/// Look up a script by name.
pub fn find(name: &str) -> Option<&'static Script> {
    SCRIPTS.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_script() {
        let script = find("rizin").unwrap();
        let session = (script.session)();
        assert_eq!(
            session.header_names().collect::<Vec<_>>(),
            vec!["rz_list.h", "rz_core.h"]
        );
        assert!(find("cutter").is_none());
    }
}
