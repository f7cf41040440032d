//! Bindings for the rizin core API.

use crate::binding::{ClassSpec, GenericMarkers, GenericSpec};
use crate::core::header::Header;
use crate::ops::generate::Session;

/// Variadic functions taking a format string; SWIG cannot forward them.
const FORMAT_FUNCTIONS: &[&str] = &[
    "rz_core_notify_begin",
    "rz_core_notify_done",
    "rz_core_notify_error",
    "rz_core_cmd_strf",
    "rz_core_cmdf",
    "rz_core_syscallf",
];

pub fn session() -> Session {
    let mut session = Session::new();

    session.header("rz_list.h", |ctx, header| {
        let mut list = ctx.generic(
            header,
            GenericSpec::new("RzList").pointer().depends_on("RzListIter"),
        )?;
        list.add_method("rz_list_length", "length", GenericMarkers::new())?;
        list.add_method("rz_list_first", "first", GenericMarkers::new().returns())?;
        list.add_python_method("__len__(self)", &["return self.length()"])?;

        ctx.generic(header, GenericSpec::new("RzListIter").pointer())?;

        // Lists are created and freed by their owners
        header.ignore("rz_list_new")?;
        header.ignore("rz_list_free")?;
        Ok(())
    });

    session.header("rz_core.h", |ctx, header| {
        ctx.enumeration(header, "RzCoreSeekMode")?;
        ctx.macro_enum(header, &[], Some("RZ_CORE_BLOCKSIZE"))?;

        ignore_all(header, FORMAT_FUNCTIONS)?;

        let mut core = ctx.class(header, ClassSpec::new("RzCore"))?;
        core.add_constructor("rz_core_new")?;
        core.add_destructor("rz_core_free")?;
        core.add_prefixed_methods("rz_core_")?;
        core.add_prefixed_funcs("rz_core_")?;

        ctx.director(header, "RzCorePlugin")?;
        Ok(())
    });

    session
}

fn ignore_all(header: &mut Header, names: &[&str]) -> Result<(), crate::binding::BindError> {
    for name in names {
        header.ignore(name)?;
    }
    Ok(())
}
