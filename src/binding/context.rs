//! The binding context.
//!
//! Every binder writes into one [`BindingContext`]; the emitter reads it once
//! after the whole binding script has run. Handles returned by
//! [`BindingContext::generic`] and [`BindingContext::class`] borrow the
//! context and the header being bound, so functions claimed through them
//! leave that header's pool.

use std::collections::HashMap;

use crate::binding::class::{Class, ClassSpec, StalePolicy};
use crate::binding::director::Director;
use crate::binding::enums::{Enum, MacroEnum};
use crate::binding::errors::BindError;
use crate::binding::func::{BindingKind, Func, FuncOptions, GenericMarkers};
use crate::binding::generic::{Generic, GenericRegistry, GenericSpec};
use crate::core::decl::DeclKind;
use crate::core::header::Header;

/// Emission and marker options.
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// SWIG module name, also the prefix of the deprecation helpers
    pub module: String,
    /// Emit `%module(directors=1)`
    pub directors: bool,
    /// Annotation a function needs to be picked up by prefix scans
    pub visibility_marker: Option<String>,
    /// Argument annotation turned into a `%contract`
    pub nonnull_marker: String,
    /// Function annotation that wraps the call in a deprecation warning
    pub deprecated_marker: String,
    pub stale_fields: StalePolicy,
}

impl Default for BindOptions {
    fn default() -> Self {
        BindOptions {
            module: "rizin".to_string(),
            directors: true,
            visibility_marker: Some("RZ_API".to_string()),
            nonnull_marker: "RZ_NONNULL".to_string(),
            deprecated_marker: "RZ_DEPRECATE".to_string(),
            stale_fields: StalePolicy::Warn,
        }
    }
}

/// All registries populated by one binding pass.
#[derive(Debug, Default)]
pub struct BindingContext {
    options: BindOptions,
    includes: Vec<String>,
    generics: GenericRegistry,
    classes: Vec<Class>,
    /// Backing struct name to class name
    class_structs: HashMap<String, String>,
    directors: Vec<Director>,
    enums: Vec<Enum>,
    macro_enums: Vec<MacroEnum>,
    warnings: Vec<String>,
}

impl BindingContext {
    pub fn new(options: BindOptions) -> Self {
        BindingContext {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Add a header to the `#include` block.
    pub fn include(&mut self, header: impl Into<String>) {
        let header = header.into();
        if !self.includes.contains(&header) {
            self.includes.push(header);
        }
    }

    /// Register a generic backed by the struct behind `spec`'s typedef.
    pub fn generic<'a>(
        &'a mut self,
        header: &'a mut Header,
        spec: GenericSpec,
    ) -> Result<GenericHandle<'a>, BindError> {
        let generic = Generic::bind(header, spec)?;
        let name = generic.name.clone();
        self.generics.register(generic)?;
        Ok(GenericHandle {
            ctx: self,
            header,
            name,
        })
    }

    /// Bind a struct as a class.
    pub fn class<'a>(
        &'a mut self,
        header: &'a mut Header,
        spec: ClassSpec,
    ) -> Result<ClassHandle<'a>, BindError> {
        let index = self.bind_class(header, spec)?;
        Ok(ClassHandle {
            ctx: self,
            header,
            index,
        })
    }

    /// Bind a hook table as a director, registering its class too.
    pub fn director(&mut self, header: &mut Header, typedef: &str) -> Result<(), BindError> {
        if self.directors.iter().any(|d| d.name == typedef) {
            return Err(BindError::DuplicateEntity {
                kind: "director",
                name: typedef.to_string(),
            });
        }
        let index = self.bind_class(header, ClassSpec::new(typedef))?;
        let director = Director::from_class(&self.classes[index])?;
        self.directors.push(director);
        Ok(())
    }

    pub fn enumeration(&mut self, header: &mut Header, typedef: &str) -> Result<(), BindError> {
        if self.enums.iter().any(|e| e.typedef_name == typedef) {
            return Err(BindError::DuplicateEntity {
                kind: "enum",
                name: typedef.to_string(),
            });
        }
        let bound = Enum::bind(header, typedef)?;
        self.enums.push(bound);
        Ok(())
    }

    /// Bind `#define` constants by name and/or prefix.
    pub fn macro_enum(
        &mut self,
        header: &mut Header,
        names: &[&str],
        prefix: Option<&str>,
    ) -> Result<(), BindError> {
        let bound = MacroEnum::bind(header, names, prefix)?;
        tracing::debug!("Bound {} macro constants", bound.defines.len());
        self.macro_enums.push(bound);
        Ok(())
    }

    /// Checks that need every generic registered: unknown dependencies,
    /// unknown extension targets and dependency cycles.
    pub fn validate(&self) -> Result<(), BindError> {
        self.generics.validate()
    }

    fn bind_class(&mut self, header: &mut Header, spec: ClassSpec) -> Result<usize, BindError> {
        if self.classes.iter().any(|c| c.name == spec.typedef) {
            return Err(BindError::DuplicateEntity {
                kind: "class",
                name: spec.typedef,
            });
        }
        let (class, warnings) =
            Class::bind(&mut self.generics, header, spec, self.options.stale_fields)?;
        self.warnings.extend(warnings);
        self.class_structs
            .insert(class.struct_name.clone(), class.name.clone());
        self.classes.push(class);
        Ok(self.classes.len() - 1)
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn generics(&self) -> &GenericRegistry {
        &self.generics
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    /// Class bound over `struct_name`, if any.
    pub fn class_for_struct(&self, struct_name: &str) -> Option<&str> {
        self.class_structs.get(struct_name).map(String::as_str)
    }

    pub fn directors(&self) -> &[Director] {
        &self.directors
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn macro_enums(&self) -> &[MacroEnum] {
        &self.macro_enums
    }

    /// Non-fatal problems found while binding.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// A registered generic, open for methods.
pub struct GenericHandle<'a> {
    ctx: &'a mut BindingContext,
    header: &'a mut Header,
    name: String,
}

impl GenericHandle<'_> {
    /// Bind `c_name` as a method of every instantiation.
    ///
    /// The first argument is the receiver; `markers` name the arguments (and
    /// possibly the result) typed by the instantiation's parameter.
    pub fn add_method(
        &mut self,
        c_name: &str,
        rename: &str,
        markers: GenericMarkers,
    ) -> Result<(), BindError> {
        let decl = self.header.pop(DeclKind::Function, c_name)?;
        let func = Func::bind(
            &mut self.ctx.generics,
            self.header.source(),
            decl,
            BindingKind::Generic(markers),
            FuncOptions::new(),
        )?;
        self.generic_mut()?.insert_method(rename.to_string(), func)
    }

    /// Add a Python method to every instantiation.
    ///
    /// `signature` is written after `def`, e.g. `__iter__(self)`.
    pub fn add_python_method(&mut self, signature: &str, body: &[&str]) -> Result<(), BindError> {
        let lines = body.iter().map(|l| l.to_string()).collect();
        self.generic_mut()?
            .python_methods
            .push((signature.to_string(), lines));
        Ok(())
    }

    /// Add raw `%extend` lines to the instantiation for `specialization`.
    ///
    /// Checked against the discovered specializations by
    /// [`BindingContext::validate`].
    pub fn add_extension(&mut self, specialization: &str, lines: &[&str]) -> Result<(), BindError> {
        self.generic_mut()?
            .extensions
            .entry(specialization.to_string())
            .or_default()
            .extend(lines.iter().map(|l| l.to_string()));
        Ok(())
    }

    fn generic_mut(&mut self) -> Result<&mut Generic, BindError> {
        let (name, header) = (&self.name, self.header.name());
        self.ctx
            .generics
            .get_mut(name)
            .ok_or_else(|| BindError::NotFound {
                kind: "generic".to_string(),
                name: name.clone(),
                header: header.to_string(),
                consumed: false,
            })
    }
}

/// A bound class, open for functions.
pub struct ClassHandle<'a> {
    ctx: &'a mut BindingContext,
    header: &'a mut Header,
    index: usize,
}

impl ClassHandle<'_> {
    pub fn class(&self) -> &Class {
        &self.ctx.classes[self.index]
    }

    pub fn add_constructor(&mut self, c_name: &str) -> Result<(), BindError> {
        self.ctx.classes[self.index].add_constructor(&mut self.ctx.generics, self.header, c_name)
    }

    pub fn add_destructor(&mut self, c_name: &str) -> Result<(), BindError> {
        self.ctx.classes[self.index].add_destructor(&mut self.ctx.generics, self.header, c_name)
    }

    pub fn add_method(
        &mut self,
        c_name: &str,
        rename: &str,
        options: FuncOptions,
    ) -> Result<(), BindError> {
        self.ctx.classes[self.index].add_method(
            &mut self.ctx.generics,
            self.header,
            c_name,
            rename,
            options,
        )
    }

    pub fn add_func(&mut self, c_name: &str, rename: &str, options: FuncOptions) -> Result<(), BindError> {
        self.ctx.classes[self.index].add_func(
            &mut self.ctx.generics,
            self.header,
            c_name,
            rename,
            options,
        )
    }

    /// Bind every visible `prefix*` function taking this struct first.
    pub fn add_prefixed_methods(&mut self, prefix: &str) -> Result<usize, BindError> {
        let visibility = self.ctx.options.visibility_marker.clone();
        let count = self.ctx.classes[self.index].add_prefixed_methods(
            &mut self.ctx.generics,
            self.header,
            prefix,
            visibility.as_deref(),
        )?;
        if count == 0 {
            tracing::warn!("no methods matched prefix `{}`", prefix);
        }
        Ok(count)
    }

    pub fn add_prefixed_funcs(&mut self, prefix: &str) -> Result<usize, BindError> {
        let visibility = self.ctx.options.visibility_marker.clone();
        self.ctx.classes[self.index].add_prefixed_funcs(
            &mut self.ctx.generics,
            self.header,
            prefix,
            visibility.as_deref(),
        )
    }
}
