//! C declarator reconstruction.
//!
//! A declarator is built inside out: starting from the declared name, each
//! type layer wraps the expression until a base type name is reached.
//! `int (*fp)(int, int)` is built as `fp`, `*fp`, `(*fp)(int, int)` and
//! finally prefixed with `int`.

use crate::binding::context::BindingContext;
use crate::core::ctype::{CType, CTypeKind, RecordType};
use crate::core::decl::PrimitiveKind;

/// Stringifies declarations against the bound generics and classes.
pub struct Declarator<'a> {
    ctx: &'a BindingContext,
}

impl<'a> Declarator<'a> {
    pub fn new(ctx: &'a BindingContext) -> Self {
        Declarator { ctx }
    }

    /// Spell a declaration of `expr` with type `ctype`.
    ///
    /// With `generic` set, generic records and `void` are spelled with the
    /// instantiation placeholder (`RzList_##TYPE`, `TYPE`). An empty `expr`
    /// yields an abstract declarator such as a cast target.
    pub fn stringify(&self, expr: &str, ctype: &CType, generic: bool) -> String {
        let mut expr = expr.to_string();
        let mut ty = ctype;
        let mut pointing = false;

        loop {
            let is_const = ty.is_const;

            match &ty.kind {
                CTypeKind::Primitive(kind) => {
                    // Primitive spellings already carry their qualifier
                    let base = match kind {
                        PrimitiveKind::Bool if ty.is_const => "const bool",
                        PrimitiveKind::Bool => "bool",
                        PrimitiveKind::Void if generic => "TYPE",
                        _ => ty.spelling.as_str(),
                    };
                    return join(base, &expr);
                }
                CTypeKind::Pointer(pointee) => {
                    expr = format!("*{}", qualify(is_const, expr));
                    ty = pointee;
                    pointing = true;
                }
                CTypeKind::Record(record) => {
                    return join(&self.record_name(record, generic), &qualify(is_const, expr));
                }
                CTypeKind::Typedef(typedef) => {
                    // The canonical type keeps the typedef's qualifier
                    if let CTypeKind::Record(record) = &typedef.canonical.kind {
                        if record.binding.is_some() || (generic && self.is_generic(record)) {
                            ty = &typedef.canonical;
                            continue;
                        }
                    }
                    return join(&typedef.name, &qualify(is_const, expr));
                }
                CTypeKind::Function(func) => {
                    expr = qualify(is_const, expr);
                    if pointing {
                        expr = format!("({})", expr);
                        pointing = false;
                    }
                    let mut args: Vec<String> = func
                        .args
                        .iter()
                        .map(|arg| self.stringify("", arg, false))
                        .collect();
                    if func.variadic {
                        args.push("...".to_string());
                    }
                    expr = format!("{}({})", expr, args.join(", "));
                    ty = &func.result;
                }
                CTypeKind::Array { element, count } => {
                    expr = qualify(is_const, expr);
                    if pointing {
                        expr = format!("({})", expr);
                        pointing = false;
                    }
                    let count = count.map(|c| c.to_string()).unwrap_or_default();
                    expr = format!("{}[{}]", expr, count);
                    ty = element;
                }
            }
        }
    }

    fn is_generic(&self, record: &RecordType) -> bool {
        self.ctx.generics().for_struct(&record.decl_spelling).is_some()
    }

    fn record_name(&self, record: &RecordType, generic: bool) -> String {
        if generic {
            if let Some(g) = self.ctx.generics().for_struct(&record.decl_spelling) {
                return format!("{}_##TYPE", g.name);
            }
        }
        if let Some(binding) = &record.binding {
            return format!("{}_{}", binding.generic, binding.specialization);
        }
        match self.ctx.class_for_struct(&record.decl_spelling) {
            Some(class) => class.to_string(),
            None => format!("{} {}", record.keyword(), record.decl_spelling),
        }
    }
}

fn qualify(is_const: bool, expr: String) -> String {
    if is_const {
        join("const", &expr)
    } else {
        expr
    }
}

/// `base expr`, without a trailing space for abstract declarators.
fn join(base: &str, expr: &str) -> String {
    if expr.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, expr)
    }
}
