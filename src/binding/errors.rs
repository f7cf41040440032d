//! Binding error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::decl::SourceLocation;
use crate::util::diagnostic::Diagnostic;

/// A fatal error raised while binding declarations.
///
/// Every variant names the declaration it was raised for and, where the
/// front end knows it, the source location, so the fix can go either into
/// the C header annotation or into the binding script.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BindError {
    #[error("{location}: unsupported type kind `{kind}` in `{spelling}`")]
    #[diagnostic(code(swivel::types::unknown_kind))]
    UnknownTypeKind {
        kind: String,
        spelling: String,
        location: SourceLocation,
    },

    #[error("`{generic}` used without a /*<type>*/ annotation")]
    #[diagnostic(
        code(swivel::generic::missing_annotation),
        help("write the type argument right after the type, e.g. `RzList /*<RzBinSymbol *>*/ *symbols`")
    )]
    MissingAnnotation {
        generic: String,
        locations: Vec<SourceLocation>,
    },

    #[error("{location}: malformed generic annotation `{token}`")]
    #[diagnostic(code(swivel::generic::malformed_annotation))]
    MalformedAnnotation {
        location: SourceLocation,
        token: String,
    },

    #[error("{location}: specialization `{token}` of `{generic}` {reason}")]
    #[diagnostic(code(swivel::generic::pointer_policy))]
    PointerPolicy {
        generic: String,
        token: String,
        reason: &'static str,
        location: SourceLocation,
    },

    #[error("duplicate field `{field}` in `{entity}`")]
    #[diagnostic(code(swivel::entity::duplicate_field))]
    DuplicateField {
        entity: String,
        field: String,
        location: SourceLocation,
    },

    #[error("duplicate method `{method}` in `{entity}`")]
    #[diagnostic(code(swivel::entity::duplicate_method))]
    DuplicateMethod {
        entity: String,
        method: String,
        location: SourceLocation,
    },

    #[error("{kind} `{name}` is bound twice")]
    #[diagnostic(code(swivel::entity::duplicate))]
    DuplicateEntity { kind: &'static str, name: String },

    #[error("{location}: {role} argument `{argument}` is not a parameter of `{function}`")]
    #[diagnostic(code(swivel::func::unknown_argument))]
    UnknownArgument {
        function: String,
        argument: String,
        role: &'static str,
        location: SourceLocation,
    },

    #[error("{location}: typemap `{typemap}` does not match `{function}`")]
    #[diagnostic(code(swivel::func::typemap_mismatch))]
    TypemapMismatch {
        function: String,
        typemap: String,
        pattern: String,
        signature: String,
        location: SourceLocation,
    },

    #[error("{location}: unexpected {kind} `{name}` in {context}")]
    #[diagnostic(code(swivel::decl::unexpected))]
    UnexpectedDecl {
        kind: String,
        name: String,
        context: String,
        location: SourceLocation,
    },

    #[error("{location}: `{name}` has an unexpected shape: {detail}")]
    #[diagnostic(code(swivel::decl::shape))]
    UnexpectedShape {
        name: String,
        detail: String,
        location: SourceLocation,
    },

    #[error("{location}: {kind} `{name}` is declared twice")]
    #[diagnostic(code(swivel::decl::redeclaration))]
    Redeclaration {
        kind: String,
        name: String,
        location: SourceLocation,
    },

    #[error("{kind} `{name}` not found in `{header}`")]
    #[diagnostic(code(swivel::decl::not_found))]
    NotFound {
        kind: String,
        name: String,
        header: String,
        consumed: bool,
    },

    #[error("{location}: typedef `{name}` does not name {expected} (found `{found}`)")]
    #[diagnostic(code(swivel::decl::wrong_underlying))]
    WrongUnderlying {
        name: String,
        expected: &'static str,
        found: String,
        location: SourceLocation,
    },

    #[error("generic `{generic}` depends on unknown generic `{dependency}`")]
    #[diagnostic(code(swivel::generic::unknown_dependency))]
    UnknownDependency { generic: String, dependency: String },

    #[error("cycle detected between generics")]
    #[diagnostic(code(swivel::generic::cycle))]
    DependencyCycle { generics: Vec<String> },

    #[error("`{specialization}` is not a specialization of `{generic}`")]
    #[diagnostic(code(swivel::generic::unknown_specialization))]
    UnknownSpecialization {
        generic: String,
        specialization: String,
        known: Vec<String>,
    },

    #[error("stale {action} field(s) in `{entity}`: {}", .fields.join(", "))]
    #[diagnostic(code(swivel::entity::stale_field))]
    StaleField {
        entity: String,
        action: &'static str,
        fields: Vec<String>,
    },
}

impl BindError {
    /// Source location of the offending declaration, if the error has one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            BindError::UnknownTypeKind { location, .. }
            | BindError::MalformedAnnotation { location, .. }
            | BindError::PointerPolicy { location, .. }
            | BindError::DuplicateField { location, .. }
            | BindError::DuplicateMethod { location, .. }
            | BindError::UnknownArgument { location, .. }
            | BindError::TypemapMismatch { location, .. }
            | BindError::UnexpectedDecl { location, .. }
            | BindError::UnexpectedShape { location, .. }
            | BindError::Redeclaration { location, .. }
            | BindError::WrongUnderlying { location, .. } => Some(location),
            BindError::MissingAnnotation { locations, .. } => locations.first(),
            _ => None,
        }
    }

    /// Replace an unknown location with the declaration's own.
    pub(crate) fn at(mut self, decl_location: &SourceLocation) -> Self {
        if let BindError::UnknownTypeKind { location, .. } = &mut self {
            if location.is_unknown() {
                *location = decl_location.clone();
            }
        }
        self
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(location) = self.location() {
            diag = diag.with_location(location.to_string());
        }

        match self {
            BindError::UnknownTypeKind { .. } => diag.with_suggestion(
                "Ignore the declaration in the binding script, or bind it by hand",
            ),

            BindError::MissingAnnotation { generic, locations } => {
                for location in locations {
                    diag = diag.with_context(format!("searched {}", location));
                }
                diag.with_suggestion(format!(
                    "Annotate the use of `{}` with its element type, e.g. `{} /*<char *>*/ *`",
                    generic, generic
                ))
            }

            BindError::MalformedAnnotation { .. } => {
                diag.with_suggestion("Generic annotations are written `/*<type>*/`")
            }

            BindError::PointerPolicy { generic, reason, .. } => {
                diag = diag.with_context(format!("`{}` {}", generic, reason));
                if *reason == "has pointer" {
                    diag.with_suggestion("Drop the trailing `*` from the annotation")
                } else {
                    diag.with_suggestion(format!(
                        "`{}` holds pointers; write the annotation as `/*<Type *>*/`",
                        generic
                    ))
                }
            }

            BindError::DuplicateField { field, .. } => diag.with_suggestion(format!(
                "Rename one of the `{}` fields in the binding script",
                field
            )),

            BindError::DuplicateMethod { method, .. } => diag.with_suggestion(format!(
                "Pass an explicit rename for one of the functions bound as `{}`",
                method
            )),

            BindError::DuplicateEntity { .. } => {
                diag.with_suggestion("Remove the second registration from the binding script")
            }

            BindError::UnknownArgument { function, .. } => diag.with_suggestion(format!(
                "Check the parameter names of `{}` in its header",
                function
            )),

            BindError::TypemapMismatch {
                pattern, signature, ..
            } => diag
                .with_context(format!("expected arguments: {}", pattern))
                .with_context(format!("actual signature: ({})", signature))
                .with_suggestion("Update the typemap or drop it from the binding script"),

            BindError::UnexpectedDecl { .. } | BindError::UnexpectedShape { .. } => {
                diag.with_suggestion("Ignore the declaration in the binding script")
            }

            BindError::Redeclaration { .. } => diag,

            BindError::NotFound { consumed, .. } => {
                if *consumed {
                    diag.with_context("the declaration was already bound or ignored")
                        .with_suggestion("Each declaration can be claimed by one entity only")
                } else {
                    diag.with_suggestion(crate::util::diagnostic::suggestions::INSPECT_HEADER)
                }
            }

            BindError::WrongUnderlying { .. } => diag,

            BindError::UnknownDependency { dependency, .. } => diag.with_suggestion(format!(
                "Register generic `{}` in the binding script",
                dependency
            )),

            BindError::DependencyCycle { generics } => diag
                .with_context(format!("cycle: {}", generics.join(" -> ")))
                .with_suggestion("Break the cycle by removing a dependency".to_string()),

            BindError::UnknownSpecialization { known, .. } => {
                if !known.is_empty() {
                    diag = diag.with_context(format!("known specializations: {}", known.join(", ")));
                }
                diag.with_suggestion("Extensions can only target specializations seen in headers")
            }

            BindError::StaleField { .. } => diag.with_suggestion(
                "Remove the stale names from the binding script, or set `[fields] stale = \"warn\"`",
            ),
        }
    }
}
