//! Directors: hook tables overridable from the target language.
//!
//! A director wraps a struct of function pointers, typically a plugin
//! vtable. Each hook gets a trampoline forwarding to an object installed
//! from Python; plain data fields are copied over when the table is built.

use crate::binding::class::{Class, FieldSlot};
use crate::binding::errors::BindError;
use crate::core::ctype::CType;

#[derive(Debug, Clone)]
pub struct DirectorArg {
    pub name: String,
    pub ctype: CType,
}

/// A function-pointer field.
#[derive(Debug, Clone)]
pub struct DirectorHook {
    pub name: String,
    pub args: Vec<DirectorArg>,
    pub result: CType,
}

#[derive(Debug)]
pub struct Director {
    pub name: String,
    /// Data fields, copied verbatim
    pub fields: Vec<(String, CType)>,
    pub hooks: Vec<DirectorHook>,
}

impl Director {
    /// Split a bound class into hooks and data fields.
    pub(crate) fn from_class(class: &Class) -> Result<Self, BindError> {
        let mut fields = Vec::new();
        let mut hooks = Vec::new();

        for slot in &class.fields {
            let field = match slot {
                FieldSlot::Field(field) => field,
                FieldSlot::Union(members) => {
                    fields.extend(members.iter().map(|m| (m.name.clone(), m.ctype.clone())));
                    continue;
                }
            };

            let Some(func) = field.ctype.as_function_pointer() else {
                fields.push((field.name.clone(), field.ctype.clone()));
                continue;
            };

            let names = match &func.arg_names {
                Some(names) if names.len() == func.args.len() => names,
                _ => {
                    return Err(BindError::UnexpectedShape {
                        name: format!("{}.{}", class.name, field.name),
                        detail: "hook parameter names could not be recovered".to_string(),
                        location: field.location.clone(),
                    })
                }
            };

            hooks.push(DirectorHook {
                name: field.name.clone(),
                args: names
                    .iter()
                    .zip(&func.args)
                    .map(|(name, ctype)| DirectorArg {
                        name: name.clone(),
                        ctype: ctype.clone(),
                    })
                    .collect(),
                result: (*func.result).clone(),
            });
        }

        tracing::debug!(
            "Bound director {} ({} hooks, {} fields)",
            class.name,
            hooks.len(),
            fields.len()
        );
        Ok(Director {
            name: class.name.clone(),
            fields,
            hooks,
        })
    }
}
