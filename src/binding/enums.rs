//! Enums and `#define` constant groups.

use crate::binding::errors::BindError;
use crate::core::decl::{DeclKind, RawTypeKind};
use crate::core::header::Header;

/// A typedef'd C enum with its constant values.
#[derive(Debug, Clone)]
pub struct Enum {
    pub typedef_name: String,
    pub constants: Vec<(String, String)>,
}

impl Enum {
    pub(crate) fn bind(header: &mut Header, typedef: &str) -> Result<Self, BindError> {
        let decl = header.pop(DeclKind::Typedef, typedef)?;
        let tag = match decl.ty.as_ref().map(|t| &t.canonical().kind) {
            Some(RawTypeKind::Enum { name }) => name.clone(),
            _ => {
                return Err(BindError::WrongUnderlying {
                    name: typedef.to_string(),
                    expected: "an enum",
                    found: decl.ty.as_ref().map(|t| t.spelling.clone()).unwrap_or_default(),
                    location: decl.location.clone(),
                })
            }
        };

        let enum_decl = header.pop(DeclKind::Enum, &tag)?;
        let mut constants = Vec::with_capacity(enum_decl.children.len());
        for constant in &enum_decl.children {
            if constant.kind != DeclKind::EnumConstant {
                return Err(BindError::UnexpectedDecl {
                    kind: constant.kind.to_string(),
                    name: constant.spelling.clone(),
                    context: format!("enum `{}`", typedef),
                    location: constant.location.clone(),
                });
            }
            let value = constant.value.clone().ok_or_else(|| BindError::UnexpectedShape {
                name: constant.spelling.clone(),
                detail: "enum constant without a value".to_string(),
                location: constant.location.clone(),
            })?;
            constants.push((constant.spelling.clone(), value));
        }

        tracing::debug!("Bound enum {} ({} constants)", typedef, constants.len());
        Ok(Enum {
            typedef_name: decl.spelling.clone(),
            constants,
        })
    }
}

/// A group of `#define` constants.
#[derive(Debug, Clone, Default)]
pub struct MacroEnum {
    pub defines: Vec<(String, String)>,
}

impl MacroEnum {
    /// Bind every unclaimed macro starting with `prefix`, then the named ones.
    pub(crate) fn bind(
        header: &mut Header,
        names: &[&str],
        prefix: Option<&str>,
    ) -> Result<Self, BindError> {
        let mut macro_enum = MacroEnum::default();

        if let Some(prefix) = prefix {
            let matching: Vec<String> = header
                .available(DeclKind::Macro)
                .filter(|d| d.spelling.starts_with(prefix))
                .map(|d| d.spelling.clone())
                .collect();
            for name in matching {
                macro_enum.push(header, &name)?;
            }
        }
        for name in names {
            macro_enum.push(header, name)?;
        }

        Ok(macro_enum)
    }

    fn push(&mut self, header: &mut Header, name: &str) -> Result<(), BindError> {
        let decl = header.pop(DeclKind::Macro, name)?;
        let definition = decl.value.clone().unwrap_or_default();
        self.defines.push((decl.spelling.clone(), definition));
        Ok(())
    }
}
