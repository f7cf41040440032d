//! The specialization pass.
//!
//! Walks a classified type together with the declarations it was written
//! in, binds every use of a generic's backing struct to the instantiation
//! named by its `/*<T>*/` comment, and fills in function argument names.

use std::sync::Arc;

use crate::binding::errors::BindError;
use crate::binding::generic::GenericRegistry;
use crate::core::ctype::{CType, CTypeKind, GenericBinding};
use crate::core::decl::{Decl, TokenSource};

/// Find the `/*<T>*/` comment between a declaration's type and its name.
///
/// Returns the raw token between the angle brackets.
pub fn find_annotation(source: &dyn TokenSource, decl: &Decl) -> Result<Option<String>, BindError> {
    let Some(start) = decl.type_start.as_ref() else {
        return Ok(None);
    };
    let Some(text) = source.text_between(start, &decl.location) else {
        return Ok(None);
    };
    let Some(open) = text.find("/*<") else {
        return Ok(None);
    };

    let rest = &text[open + 3..];
    match rest.find("*/") {
        Some(close) if rest[..close].ends_with('>') => Ok(Some(rest[..close - 1].to_string())),
        _ => {
            let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
            Err(BindError::MalformedAnnotation {
                location: decl.location.clone(),
                token: format!("/*<{}", &rest[..end]),
            })
        }
    }
}

pub(crate) struct Specializer<'a> {
    generics: &'a mut GenericRegistry,
    source: &'a dyn TokenSource,
}

impl<'a> Specializer<'a> {
    pub fn new(generics: &'a mut GenericRegistry, source: &'a dyn TokenSource) -> Self {
        Specializer { generics, source }
    }

    /// Run the pass over the type of `decl`.
    pub fn visit_decl(&mut self, decl: &Arc<Decl>, ty: &mut CType) -> Result<(), BindError> {
        self.visit(&[Arc::clone(decl)], ty)
    }

    /// `sites` are the declarations whose text may hold the annotation,
    /// searched in order: the use site first, then typedefs passed through.
    pub fn visit(&mut self, sites: &[Arc<Decl>], ty: &mut CType) -> Result<(), BindError> {
        match &mut ty.kind {
            CTypeKind::Pointer(pointee) => self.visit(sites, pointee),

            CTypeKind::Typedef(typedef) => {
                if matches!(typedef.canonical.kind, CTypeKind::Record(_)) {
                    return self.visit(sites, &mut typedef.canonical);
                }
                match &typedef.decl {
                    Some(decl) => {
                        let mut extended = sites.to_vec();
                        extended.push(Arc::clone(decl));
                        self.visit(&extended, &mut typedef.canonical)
                    }
                    None => self.visit(sites, &mut typedef.canonical),
                }
            }

            CTypeKind::Function(func) => {
                self.visit(sites, &mut func.result)?;

                let Some(owner) = sites.last() else {
                    return Ok(());
                };
                let params: Vec<Arc<Decl>> = owner.params().cloned().collect();
                if params.len() != func.args.len() {
                    return Err(BindError::UnexpectedShape {
                        name: owner.spelling.clone(),
                        detail: format!(
                            "{} parameter declarations for {} arguments",
                            params.len(),
                            func.args.len()
                        ),
                        location: owner.location.clone(),
                    });
                }

                let mut names = Vec::with_capacity(params.len());
                for (i, (param, arg)) in params.iter().zip(func.args.iter_mut()).enumerate() {
                    self.visit(std::slice::from_ref(param), arg)?;
                    names.push(if param.spelling.is_empty() {
                        format!("arg{}", i)
                    } else {
                        param.spelling.clone()
                    });
                }
                func.arg_names = Some(names);
                Ok(())
            }

            CTypeKind::Record(record) => {
                let Some(generic) = self.generics.for_struct(&record.decl_spelling) else {
                    return Ok(());
                };

                for site in sites {
                    if let Some(token) = find_annotation(self.source, site)? {
                        let key = generic.key(&token, &site.location)?;
                        let name = generic.name.clone();
                        tracing::trace!("{}: {}<{}>", site.location, name, key);
                        self.generics.record(&name, &key);
                        record.binding = Some(GenericBinding {
                            generic: name,
                            specialization: key,
                        });
                        return Ok(());
                    }
                }

                Err(BindError::MissingAnnotation {
                    generic: generic.name.clone(),
                    locations: sites.iter().map(|s| s.location.clone()).collect(),
                })
            }

            CTypeKind::Array { .. } | CTypeKind::Primitive(_) => Ok(()),
        }
    }
}
